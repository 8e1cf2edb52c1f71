//! Owned 3-channel frame buffer.

use crate::GrayImage;
use image::{Rgb, RgbImage};
use std::fmt;

/// Errors produced when building a [`Frame`] from raw parts.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid frame buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },
}

/// One captured image: a contiguous, row-major, interleaved RGB8 buffer.
///
/// A frame is owned by exactly one side at a time. The capture engine moves it
/// into its slot and a successful grab moves it out again; nothing aliases it.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    image: RgbImage,
    sequence: u64,
}

impl Frame {
    /// Number of interleaved channels per pixel.
    pub const CHANNELS: usize = 3;

    /// Black frame of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbImage::new(width, height))
    }

    /// Frame filled with a single color.
    pub fn filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    /// Wrap a raw interleaved RGB buffer of exactly `width * height * 3` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(Self::CHANNELS))
            .ok_or(FrameError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(FrameError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        RgbImage::from_raw(width, height, data)
            .map(Self::from_image)
            .ok_or(FrameError::InvalidDimensions { width, height })
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image, sequence: 0 }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Raw interleaved pixel bytes, `width * height * 3` long.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    #[inline]
    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut *self.image
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }

    #[inline]
    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    #[inline]
    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Capture sequence number assigned by the producer (0 if never stamped).
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: u64) {
        self.sequence = sequence;
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Pixel at `(x, y)`, or `None` outside the frame.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Set the pixel at `(x, y)`; out-of-bounds writes are ignored.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if let Some(p) = self.image.get_pixel_mut_checked(x, y) {
            *p = Rgb(color);
        }
    }

    /// Integer Rec.601 luma conversion.
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .image
            .as_raw()
            .chunks_exact(Self::CHANNELS)
            .map(|px| {
                let y = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                ((y + 500) / 1000) as u8
            })
            .collect();
        GrayImage {
            width: self.width() as usize,
            height: self.height() as usize,
            data,
        }
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self::from_image(image)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("sequence", &self.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_checks_buffer_length() {
        let err = Frame::from_raw(4, 2, vec![0; 10]).unwrap_err();
        assert_eq!(
            err,
            FrameError::InvalidBuffer {
                expected: 24,
                got: 10
            }
        );

        let frame = Frame::from_raw(4, 2, vec![7; 24]).expect("valid buffer");
        assert_eq!(frame.dimensions(), (4, 2));
        assert_eq!(frame.as_raw().len(), 24);
    }

    #[test]
    fn gray_conversion_uses_luma_weights() {
        let mut frame = Frame::new(3, 1);
        frame.put_pixel(0, 0, [255, 255, 255]);
        frame.put_pixel(1, 0, [255, 0, 0]);
        frame.put_pixel(2, 0, [0, 0, 255]);

        let gray = frame.to_gray();
        assert_eq!(gray.data, vec![255, 76, 29]);
    }

    #[test]
    fn out_of_bounds_pixel_access_is_ignored() {
        let mut frame = Frame::filled(2, 2, [1, 2, 3]);
        frame.put_pixel(5, 5, [9, 9, 9]);
        assert_eq!(frame.pixel(1, 1), Some([1, 2, 3]));
        assert_eq!(frame.pixel(2, 0), None);
    }
}
