//! Pinhole camera with Brown–Conrady (k1, k2, p1, p2) lens distortion.
//!
//! Pixel coordinates follow the pixel-centre convention: integer
//! coordinates address pixel centres.

use nalgebra::{Matrix3, Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

const UNDISTORT_ITERATIONS: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(self.fx, 0.0, self.cx, 0.0, self.fy, self.cy, 0.0, 0.0, 1.0)
    }

    /// The 3×3 camera matrix as 9 row-major values.
    pub fn to_row_major(&self) -> [f64; 9] {
        [
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        ]
    }

    /// Read `fx, fy, cx, cy` from 9 row-major values; `None` for any other length.
    pub fn from_row_major(m: &[f64]) -> Option<Self> {
        if m.len() != 9 {
            return None;
        }
        Some(Self::new(m[0], m[4], m[2], m[5]))
    }

    #[inline]
    pub fn normalize(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }

    #[inline]
    pub fn denormalize(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(self.fx * p.x + self.cx, self.fy * p.y + self.cy)
    }

    pub fn is_finite(&self) -> bool {
        self.fx.is_finite() && self.fy.is_finite() && self.cx.is_finite() && self.cy.is_finite()
    }
}

/// Radial (k1, k2) and tangential (p1, p2) distortion coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
}

impl Distortion {
    pub const LEN: usize = 4;

    pub fn new(k1: f64, k2: f64, p1: f64, p2: f64) -> Self {
        Self { k1, k2, p1, p2 }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.k1, self.k2, self.p1, self.p2]
    }

    /// Read exactly 4 values `k1, k2, p1, p2`.
    pub fn from_slice(d: &[f64]) -> Option<Self> {
        match d {
            [k1, k2, p1, p2] => Some(Self::new(*k1, *k2, *p1, *p2)),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Apply distortion to an undistorted normalized point.
    #[inline]
    pub fn distort(&self, p: Point2<f64>) -> Point2<f64> {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
        let xd = x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Point2::new(xd, yd)
    }

    /// Invert [`Distortion::distort`] by fixed-point iteration.
    pub fn undistort(&self, pd: Point2<f64>) -> Point2<f64> {
        let (mut x, mut y) = (pd.x, pd.y);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2;
            if radial.abs() < 1e-12 {
                break;
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (pd.x - dx) / radial;
            y = (pd.y - dy) / radial;
        }
        Point2::new(x, y)
    }
}

/// Board-to-camera rigid transform as a Rodrigues vector and a translation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
}

impl Pose {
    pub fn from_rotation(rotation: &Rotation3<f64>, translation: Vector3<f64>) -> Self {
        let r = rotation.scaled_axis();
        Self {
            rvec: [r.x, r.y, r.z],
            tvec: [translation.x, translation.y, translation.z],
        }
    }

    pub fn rotation(&self) -> Rotation3<f64> {
        Rotation3::from_scaled_axis(Vector3::from(self.rvec))
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::from(self.tvec)
    }
}

/// Project a board point through pose, distortion and intrinsics.
///
/// Points at or behind the camera plane are clamped just in front of it.
#[inline]
pub fn project_point(
    intrinsics: &CameraIntrinsics,
    distortion: &Distortion,
    rotation: &Rotation3<f64>,
    translation: &Vector3<f64>,
    p: &Point3<f64>,
) -> Point2<f64> {
    let pc = rotation * p.coords + translation;
    let z = pc.z.max(1e-9);
    let n = Point2::new(pc.x / z, pc.y / z);
    intrinsics.denormalize(distortion.distort(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn undistort_inverts_distort() {
        let d = Distortion::new(-0.28, 0.09, 0.0012, -0.0008);
        for p in [
            Point2::new(0.0, 0.0),
            Point2::new(0.3, -0.2),
            Point2::new(-0.45, 0.35),
        ] {
            let back = d.undistort(d.distort(p));
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-9);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn row_major_layout_round_trips() {
        let k = CameraIntrinsics::new(800.0, 790.0, 320.0, 240.0);
        let m = k.to_row_major();
        assert_eq!(m[0], 800.0);
        assert_eq!(m[2], 320.0);
        assert_eq!(m[4], 790.0);
        assert_eq!(m[5], 240.0);
        assert_eq!(m[8], 1.0);
        assert_eq!(CameraIntrinsics::from_row_major(&m), Some(k));
        assert_eq!(CameraIntrinsics::from_row_major(&m[..8]), None);
        assert_eq!(Distortion::from_slice(&[0.1, 0.2, 0.3]), None);
    }

    #[test]
    fn projection_of_optical_axis_hits_principal_point() {
        let k = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0);
        let pose = Pose {
            rvec: [0.0, 0.0, 0.0],
            tvec: [0.0, 0.0, 400.0],
        };
        let p = project_point(
            &k,
            &Distortion::new(-0.2, 0.05, 0.0, 0.0),
            &pose.rotation(),
            &pose.translation(),
            &Point3::origin(),
        );
        assert_abs_diff_eq!(p.x, 320.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 240.0, epsilon = 1e-12);
    }
}
