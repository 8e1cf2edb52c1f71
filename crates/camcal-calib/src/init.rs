//! Closed-form starting point for the non-linear refinement.
//!
//! Each view contributes a board-to-image homography. With the principal
//! point fixed at the image centre, the two rotation-column constraints of
//! every homography (orthogonal, equal norm) are linear in `1/fx²` and
//! `1/fy²`; the poses then follow from decomposing each homography.

use crate::model::{CameraIntrinsics, Pose};
use crate::{Observation, SolveError};
use camcal_core::{estimate_homography, Homography};
use log::debug;
use nalgebra::{Matrix2, Matrix3, Point2, Rotation3, Vector2, Vector3};

const MIN_POINTS_PER_VIEW: usize = 4;

/// Board-plane to image homography for every view.
pub fn view_homographies(views: &[Observation]) -> Result<Vec<Homography>, SolveError> {
    views
        .iter()
        .enumerate()
        .map(|(view, obs)| {
            if obs.len() < MIN_POINTS_PER_VIEW {
                return Err(SolveError::TooFewPoints {
                    view,
                    count: obs.len(),
                });
            }
            let board: Vec<Point2<f64>> = obs
                .object_points()
                .iter()
                .map(|p| Point2::new(p.x, p.y))
                .collect();
            let h = estimate_homography(&board, obs.image_points())
                .ok_or(SolveError::HomographyFailed { view })?;
            debug!(
                "view {view}: homography transfer rms {:.3} px",
                h.transfer_rms(&board, obs.image_points())
            );
            Ok(h)
        })
        .collect()
}

/// Focal lengths from homography constraints with a known principal point.
///
/// Falls back to a single shared focal length when the per-axis system is
/// rank deficient (e.g. every view tilted about the same image axis).
pub fn estimate_focal(
    homographies: &[Homography],
    cx: f64,
    cy: f64,
) -> Result<(f64, f64), SolveError> {
    let shift = Matrix3::new(1.0, 0.0, -cx, 0.0, 1.0, -cy, 0.0, 0.0, 1.0);

    let mut ata = Matrix2::<f64>::zeros();
    let mut atb = Vector2::<f64>::zeros();
    let mut iso_aa = 0.0;
    let mut iso_ab = 0.0;

    for hom in homographies {
        let hc = shift * hom.h;
        let norm = (hc.column(0).norm_squared() + hc.column(1).norm_squared()).sqrt();
        if norm <= f64::EPSILON {
            continue;
        }
        let hc = hc / norm;
        let h1 = hc.column(0);
        let h2 = hc.column(1);

        let rows = [
            (h1[0] * h2[0], h1[1] * h2[1], -h1[2] * h2[2]),
            (
                h1[0] * h1[0] - h2[0] * h2[0],
                h1[1] * h1[1] - h2[1] * h2[1],
                -(h1[2] * h1[2] - h2[2] * h2[2]),
            ),
        ];
        for (a, b, rhs) in rows {
            let scale = a.hypot(b);
            if scale <= 1e-9 {
                continue;
            }
            let row = Vector2::new(a / scale, b / scale);
            let rhs = rhs / scale;
            ata += row * row.transpose();
            atb += row * rhs;
            let sum = row[0] + row[1];
            iso_aa += sum * sum;
            iso_ab += sum * rhs;
        }
    }

    let anisotropic = ata
        .try_inverse()
        .filter(|_| {
            let svd = ata.svd(false, false);
            let (max, min) = (svd.singular_values.max(), svd.singular_values.min());
            max > 0.0 && min / max > 1e-10
        })
        .map(|inv| inv * atb)
        .filter(|ab| ab[0] > 0.0 && ab[1] > 0.0);

    let (a, b) = match anisotropic {
        Some(ab) => (ab[0], ab[1]),
        None if iso_aa > 1e-12 && iso_ab / iso_aa > 0.0 => {
            log::debug!("focal init: falling back to a shared focal length");
            let a = iso_ab / iso_aa;
            (a, a)
        }
        None => return Err(SolveError::DegenerateIntrinsics),
    };

    let (fx, fy) = (1.0 / a.sqrt(), 1.0 / b.sqrt());
    if !fx.is_finite() || !fy.is_finite() {
        return Err(SolveError::DegenerateIntrinsics);
    }
    Ok((fx, fy))
}

/// Board pose from a plane-to-image homography and intrinsics.
///
/// The rotation is projected onto SO(3); the board is kept in front of
/// the camera.
pub fn pose_from_homography(intrinsics: &CameraIntrinsics, hom: &Homography) -> Option<Pose> {
    let k_inv = intrinsics.matrix().try_inverse()?;
    let k_inv_h1 = k_inv * hom.h.column(0);
    let k_inv_h2 = k_inv * hom.h.column(1);
    let k_inv_h3 = k_inv * hom.h.column(2);

    let denom = 0.5 * (k_inv_h1.norm() + k_inv_h2.norm());
    if denom <= 1e-12 {
        return None;
    }
    let mut lambda = 1.0 / denom;
    if k_inv_h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1: Vector3<f64> = k_inv_h1 * lambda;
    let r2: Vector3<f64> = k_inv_h2 * lambda;
    let t: Vector3<f64> = k_inv_h3 * lambda;
    let r3 = r1.cross(&r2);
    if r3.norm() <= 1e-12 {
        return None;
    }

    let r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = r.svd(true, true);
    let (mut u, v_t) = (svd.u?, svd.v_t?);
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    let rotation = Rotation3::from_matrix_unchecked(u * v_t);
    Some(Pose::from_rotation(&rotation, t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{project_point, Distortion};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn board() -> Vec<Point3<f64>> {
        (0..6)
            .flat_map(|r| (0..9).map(move |c| Point3::new(c as f64 * 25.0, r as f64 * 25.0, 0.0)))
            .collect()
    }

    fn view(k: &CameraIntrinsics, pose: &Pose) -> Observation {
        let pts = board();
        let img = pts
            .iter()
            .map(|p| {
                project_point(
                    k,
                    &Distortion::default(),
                    &pose.rotation(),
                    &pose.translation(),
                    p,
                )
            })
            .collect();
        Observation::new(pts, img).unwrap()
    }

    fn tilted_pose() -> Pose {
        Pose {
            rvec: [0.35, -0.3, 0.1],
            tvec: [-90.0, -70.0, 560.0],
        }
    }

    #[test]
    fn focal_is_recovered_from_a_single_tilted_view() {
        let k = CameraIntrinsics::new(600.0, 620.0, 319.5, 239.5);
        let homs = view_homographies(&[view(&k, &tilted_pose())]).unwrap();
        let (fx, fy) = estimate_focal(&homs, k.cx, k.cy).unwrap();
        assert_relative_eq!(fx, 600.0, max_relative = 1e-6);
        assert_relative_eq!(fy, 620.0, max_relative = 1e-6);
    }

    #[test]
    fn fronto_parallel_view_is_degenerate() {
        let k = CameraIntrinsics::new(600.0, 600.0, 319.5, 239.5);
        let pose = Pose {
            rvec: [0.0, 0.0, 0.0],
            tvec: [-100.0, -60.0, 500.0],
        };
        let homs = view_homographies(&[view(&k, &pose)]).unwrap();
        assert_eq!(
            estimate_focal(&homs, k.cx, k.cy),
            Err(SolveError::DegenerateIntrinsics)
        );
    }

    #[test]
    fn pose_is_recovered_from_homography() {
        let k = CameraIntrinsics::new(600.0, 600.0, 319.5, 239.5);
        let truth = tilted_pose();
        let homs = view_homographies(&[view(&k, &truth)]).unwrap();
        let pose = pose_from_homography(&k, &homs[0]).unwrap();
        for i in 0..3 {
            assert!((pose.rvec[i] - truth.rvec[i]).abs() < 1e-6, "{pose:?}");
            assert!((pose.tvec[i] - truth.tvec[i]).abs() < 1e-4, "{pose:?}");
        }
    }

    #[test]
    fn views_with_too_few_points_are_rejected() {
        let obs = Observation::new(
            vec![Point3::origin(); 3],
            vec![Point2::new(0.0, 0.0); 3],
        )
        .unwrap();
        assert_eq!(
            view_homographies(&[obs]).unwrap_err(),
            SolveError::TooFewPoints { view: 0, count: 3 }
        );
    }
}
