//! Lens-distortion removal by inverse mapping.
//!
//! Every output pixel is treated as an undistorted image point: it is
//! normalized with the intrinsics, pushed through the distortion model and
//! projected back with the same intrinsics. The source frame is sampled
//! bilinearly at that location; samples falling outside the source are black.

use crate::model::{CameraIntrinsics, Distortion};
use crate::CalibrationResult;
use camcal_core::Frame;
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Precomputed source coordinates for every output pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct UndistortMap {
    width: u32,
    height: u32,
    source: Vec<[f32; 2]>,
}

impl UndistortMap {
    pub fn new(result: &CalibrationResult, width: u32, height: u32) -> Self {
        Self::from_model(&result.intrinsics, &result.distortion, width, height)
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(intrinsics, distortion))
    )]
    pub fn from_model(
        intrinsics: &CameraIntrinsics,
        distortion: &Distortion,
        width: u32,
        height: u32,
    ) -> Self {
        let mut source = Vec::with_capacity(width as usize * height as usize);
        for v in 0..height {
            for u in 0..width {
                let n = intrinsics.normalize(Point2::new(u as f64, v as f64));
                let p = intrinsics.denormalize(distortion.distort(n));
                source.push([p.x as f32, p.y as f32]);
            }
        }
        Self {
            width,
            height,
            source,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Source location sampled for output pixel `(u, v)`.
    pub fn source(&self, u: u32, v: u32) -> Option<[f32; 2]> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.source
            .get(v as usize * self.width as usize + u as usize)
            .copied()
    }

    /// Remap `frame` into a new undistorted frame.
    ///
    /// # Panics
    ///
    /// If the frame size differs from the size the map was built for.
    pub fn apply(&self, frame: &Frame) -> Frame {
        assert_eq!(
            frame.dimensions(),
            (self.width, self.height),
            "frame size does not match the undistort map"
        );

        let src = frame.as_raw();
        let (w, h) = (self.width as usize, self.height as usize);
        let mut out = Frame::new(self.width, self.height).with_sequence(frame.sequence());
        for (px, [sx, sy]) in out
            .as_raw_mut()
            .chunks_exact_mut(Frame::CHANNELS)
            .zip(&self.source)
        {
            px.copy_from_slice(&sample_bilinear_rgb(src, w, h, *sx, *sy));
        }
        out
    }
}

/// Bilinear RGB sample; neighbours outside the image contribute black.
fn sample_bilinear_rgb(src: &[u8], w: usize, h: usize, x: f32, y: f32) -> [u8; 3] {
    if !(x > -1.0 && y > -1.0 && x < w as f32 && y < h as f32) {
        return [0; 3];
    }
    let x0 = x.floor();
    let y0 = y.floor();
    let tx = x - x0;
    let ty = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (0, 0, (1.0 - tx) * (1.0 - ty)),
        (1, 0, tx * (1.0 - ty)),
        (0, 1, (1.0 - tx) * ty),
        (1, 1, tx * ty),
    ];
    let mut acc = [0.0f32; 3];
    for (dx, dy, weight) in taps {
        let (px, py) = (x0 + dx, y0 + dy);
        if weight == 0.0 || px < 0 || py < 0 || px >= w as i64 || py >= h as i64 {
            continue;
        }
        let idx = (py as usize * w + px as usize) * Frame::CHANNELS;
        for c in 0..3 {
            acc[c] += weight * src[idx + c] as f32;
        }
    }
    acc.map(|v| (v + 0.5).clamp(0.0, 255.0) as u8)
}

/// Undistort `frame` with a calibration result. Pure: identical inputs give
/// bit-identical outputs.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(width = frame.width(), height = frame.height()))
)]
pub fn rectify(frame: &Frame, result: &CalibrationResult) -> Frame {
    rectify_with(frame, &result.intrinsics, &result.distortion)
}

/// [`rectify`] with an explicit camera model.
pub fn rectify_with(
    frame: &Frame,
    intrinsics: &CameraIntrinsics,
    distortion: &Distortion,
) -> Frame {
    UndistortMap::from_model(intrinsics, distortion, frame.width(), frame.height()).apply(frame)
}
