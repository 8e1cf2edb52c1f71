//! ChESS X-junction response and candidate extraction.
//!
//! For each pixel, 16 samples on a radius-5 ring are combined into
//! `R = SR - DR - 16 * MR`: the sum response `SR` rewards opposite quadrants
//! of equal color, the diff response `DR` penalizes edges, and the mean
//! response `MR` penalizes blobs whose ring mean differs from the centre.

use crate::geom::wrap_pi;
use crate::params::ResponseParams;
use camcal_core::{Corner, GrayImageView};
use nalgebra::Point2;

const RING: [(i32, i32); 16] = [
    (0, -5),
    (2, -5),
    (3, -3),
    (5, -2),
    (5, 0),
    (5, 2),
    (3, 3),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-3, 3),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-3, -3),
    (-2, -5),
];

/// Pixels closer than this to the border get no response.
pub const RING_BORDER: usize = 6;

/// Dense response map, row-major, same size as the input.
#[derive(Clone, Debug)]
pub struct ResponseMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ResponseMap {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }
}

#[inline]
fn ring_samples(img: &GrayImageView<'_>, x: usize, y: usize) -> [f32; 16] {
    let mut s = [0.0f32; 16];
    for (k, (dx, dy)) in RING.iter().enumerate() {
        let xx = (x as i32 + dx) as usize;
        let yy = (y as i32 + dy) as usize;
        s[k] = img.data[yy * img.width + xx] as f32;
    }
    s
}

#[inline]
fn response_at(img: &GrayImageView<'_>, x: usize, y: usize) -> f32 {
    let s = ring_samples(img, x, y);

    let mut sr = 0.0f32;
    for n in 0..4 {
        sr += ((s[n] + s[n + 8]) - (s[n + 4] + s[n + 12])).abs();
    }
    let mut dr = 0.0f32;
    for n in 0..8 {
        dr += (s[n] - s[n + 8]).abs();
    }

    let ring_mean = s.iter().sum::<f32>() / 16.0;
    let w = img.width;
    let at = |xx: usize, yy: usize| img.data[yy * w + xx] as f32;
    let local_mean =
        (at(x, y) + at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1)) / 5.0;
    let mr = (ring_mean - local_mean).abs();

    sr - dr - 16.0 * mr
}

/// Compute the ChESS response for every pixel; the border band is zero.
pub fn chess_response(img: &GrayImageView<'_>) -> ResponseMap {
    let (w, h) = (img.width, img.height);
    let mut data = vec![0.0f32; w * h];
    if w > 2 * RING_BORDER && h > 2 * RING_BORDER {
        for y in RING_BORDER..h - RING_BORDER {
            for x in RING_BORDER..w - RING_BORDER {
                data[y * w + x] = response_at(img, x, y);
            }
        }
    }
    ResponseMap {
        width: w,
        height: h,
        data,
    }
}

/// Direction of the white diagonal, from the second harmonic of the ring.
///
/// Returns an angle in `[0, π)`.
pub fn ring_orientation(img: &GrayImageView<'_>, x: usize, y: usize) -> f32 {
    let s = ring_samples(img, x, y);
    let (mut c, mut si) = (0.0f32, 0.0f32);
    for (k, (dx, dy)) in RING.iter().enumerate() {
        let phi = (*dy as f32).atan2(*dx as f32);
        c += s[k] * (2.0 * phi).cos();
        si += s[k] * (2.0 * phi).sin();
    }
    wrap_pi(0.5 * si.atan2(c))
}

/// Strict local maximum test with raster-order tie breaking.
fn is_local_max(map: &ResponseMap, x: usize, y: usize, radius: usize) -> bool {
    let v = map.get(x, y);
    let x0 = x.saturating_sub(radius);
    let y0 = y.saturating_sub(radius);
    let x1 = (x + radius).min(map.width - 1);
    let y1 = (y + radius).min(map.height - 1);
    for yy in y0..=y1 {
        for xx in x0..=x1 {
            if xx == x && yy == y {
                continue;
            }
            let other = map.get(xx, yy);
            let earlier = (yy, xx) < (y, x);
            if other > v || (earlier && other == v) {
                return false;
            }
        }
    }
    true
}

/// Extract X-junction candidates: threshold, non-maximum suppression and
/// orientation estimation.
pub fn detect_candidates(img: &GrayImageView<'_>, params: &ResponseParams) -> Vec<Corner> {
    let map = chess_response(img);
    let max = map.max_value();
    let threshold = (params.threshold_rel * max).max(params.threshold_abs);
    if max <= threshold {
        return Vec::new();
    }

    let radius = params.nms_radius.max(1) as usize;
    let mut out = Vec::new();
    for y in RING_BORDER..map.height.saturating_sub(RING_BORDER) {
        for x in RING_BORDER..map.width.saturating_sub(RING_BORDER) {
            let v = map.get(x, y);
            if v <= threshold || !is_local_max(&map, x, y, radius) {
                continue;
            }
            out.push(Corner {
                position: Point2::new(x as f32, y as f32),
                orientation: ring_orientation(img, x, y),
                strength: v,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcal_core::GrayImage;
    use std::f32::consts::FRAC_PI_4;

    /// Four-quadrant X-junction at (cx, cy), white in the top-left and
    /// bottom-right quadrants.
    fn x_junction(w: usize, h: usize, cx: usize, cy: usize) -> GrayImage {
        let mut img = GrayImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let left = x < cx;
                let top = y < cy;
                img.data[y * w + x] = if left == top { 255 } else { 0 };
            }
        }
        img
    }

    #[test]
    fn blank_image_has_no_candidates() {
        let img = GrayImage::new(64, 48);
        assert!(detect_candidates(&img.view(), &ResponseParams::default()).is_empty());

        let mut flat = GrayImage::new(64, 48);
        flat.data.fill(200);
        assert!(detect_candidates(&flat.view(), &ResponseParams::default()).is_empty());
    }

    #[test]
    fn single_junction_is_found_near_its_centre() {
        let img = x_junction(40, 40, 20, 20);
        let corners = detect_candidates(&img.view(), &ResponseParams::default());
        assert_eq!(corners.len(), 1, "{corners:?}");

        let c = corners[0];
        assert!((c.position.x - 19.5).abs() <= 1.0);
        assert!((c.position.y - 19.5).abs() <= 1.0);
    }

    #[test]
    fn orientation_follows_white_diagonal() {
        let img = x_junction(40, 40, 20, 20);
        // White quadrants are top-left and bottom-right: the diagonal y = x,
        // which is +45° in image coordinates (y down).
        let theta = ring_orientation(&img.view(), 20, 20);
        assert!((theta - FRAC_PI_4).abs() < 0.15, "theta = {theta}");
    }

    #[test]
    fn straight_edge_scores_below_junction() {
        let mut edge = GrayImage::new(40, 40);
        for y in 0..40 {
            for x in 20..40 {
                edge.data[y * 40 + x] = 255;
            }
        }
        let map = chess_response(&edge.view());
        assert!(map.max_value() <= 0.0);

        let junction = chess_response(&x_junction(40, 40, 20, 20).view());
        assert!(junction.max_value() > 500.0);
    }
}
