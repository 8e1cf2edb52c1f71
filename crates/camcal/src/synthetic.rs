//! Ray-traced checkerboard scenes for tests, benches and demos.
//!
//! A board of `(pattern_width + 1) x (pattern_height + 1)` squares lies on
//! the `Z = 0` plane, with inner corner `(col, row)` at `(col * s, row * s)`.
//! Everything outside the board is white.

use crate::calib::{CameraIntrinsics, Distortion, PatternGeometry, Pose};
use camcal_calib::project_point;
use camcal_core::Frame;
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Vector3};

const DARK: u8 = 25;
const LIGHT: u8 = 230;

/// Camera used to render a scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticCamera {
    pub intrinsics: CameraIntrinsics,
    pub distortion: Distortion,
    pub width: u32,
    pub height: u32,
}

impl SyntheticCamera {
    /// Distortion-free camera with the principal point at the image centre.
    pub fn pinhole(focal: f64, width: u32, height: u32) -> Self {
        Self {
            intrinsics: CameraIntrinsics::new(
                focal,
                focal,
                (width as f64 - 1.0) * 0.5,
                (height as f64 - 1.0) * 0.5,
            ),
            distortion: Distortion::default(),
            width,
            height,
        }
    }

    pub fn with_distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = distortion;
        self
    }
}

/// Pose placing the board centre on the optical axis at `distance`, rotated by `rvec`.
pub fn board_facing_camera(geometry: &PatternGeometry, rvec: [f64; 3], distance: f64) -> Pose {
    let s = geometry.square_size_mm();
    let centre = Vector3::new(
        (geometry.pattern_width() - 1) as f64 * s * 0.5,
        (geometry.pattern_height() - 1) as f64 * s * 0.5,
        0.0,
    );
    let rotation = Pose {
        rvec,
        tvec: [0.0; 3],
    }
    .rotation();
    let t = Vector3::new(0.0, 0.0, distance) - rotation * centre;
    Pose::from_rotation(&rotation, t)
}

/// Exact image positions of the inner corners, row-major.
pub fn project_corners(
    camera: &SyntheticCamera,
    geometry: &PatternGeometry,
    pose: &Pose,
) -> Vec<Point2<f64>> {
    let (rotation, translation) = (pose.rotation(), pose.translation());
    geometry
        .object_points()
        .iter()
        .map(|p| project_point(&camera.intrinsics, &camera.distortion, &rotation, &translation, p))
        .collect()
}

/// Render the board seen from `camera` with `supersampling²` rays per pixel.
pub fn render_checkerboard(
    camera: &SyntheticCamera,
    geometry: &PatternGeometry,
    pose: &Pose,
    supersampling: u32,
) -> Frame {
    let ss = supersampling.max(1);
    let s = geometry.square_size_mm();
    let (cols, rows) = (
        geometry.pattern_width() as i64,
        geometry.pattern_height() as i64,
    );

    // board <- camera
    let rt = pose.rotation().inverse();
    let rt_t = rt * pose.translation();
    let distorted = !camera.distortion.is_zero();

    let shade = |px: f64, py: f64| -> u8 {
        let mut n = camera.intrinsics.normalize(Point2::new(px, py));
        if distorted {
            n = camera.distortion.undistort(n);
        }
        let dir = rt * Vector3::new(n.x, n.y, 1.0);
        if dir.z.abs() < 1e-12 {
            return LIGHT;
        }
        let lambda = rt_t.z / dir.z;
        if lambda <= 0.0 {
            return LIGHT;
        }
        let b = dir * lambda - rt_t;
        let (a, c) = ((b.x / s).floor() as i64, (b.y / s).floor() as i64);
        let on_board = (-1..cols).contains(&a) && (-1..rows).contains(&c);
        if on_board && (a + c).rem_euclid(2) == 0 {
            DARK
        } else {
            LIGHT
        }
    };

    let inv = 1.0 / ss as f64;
    let image = RgbImage::from_fn(camera.width, camera.height, |x, y| {
        let mut acc = 0u32;
        for sy in 0..ss {
            for sx in 0..ss {
                let px = x as f64 - 0.5 + (sx as f64 + 0.5) * inv;
                let py = y as f64 - 0.5 + (sy as f64 + 0.5) * inv;
                acc += shade(px, py) as u32;
            }
        }
        let v = ((acc + ss * ss / 2) / (ss * ss)) as u8;
        Rgb([v, v, v])
    });
    Frame::from_image(image)
}
