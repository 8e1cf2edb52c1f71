//! Iterative sub-pixel corner refinement.
//!
//! At the true corner `q`, every image gradient `g(p)` in the window is
//! orthogonal to `p - q` (it is either zero inside a flat square or
//! perpendicular to an edge through `q`). Stacking `g gᵀ (p - q) = 0` gives
//! the normal equations `G q = Σ g gᵀ p` solved at each iteration.

use crate::params::SubPixParams;
use camcal_core::GrayImageView;
use nalgebra::Point2;

/// Refine one corner, returning the original position if the iteration
/// diverges out of the window or the structure tensor is singular.
pub fn refine_corner(
    img: &GrayImageView<'_>,
    initial: Point2<f32>,
    half_window: u32,
    params: &SubPixParams,
) -> Point2<f32> {
    let win = half_window.max(1) as i32;
    let inv_win = 1.0 / win as f64;
    let eps = params.epsilon.max(0.0) as f64;

    let (x0, y0) = (initial.x as f64, initial.y as f64);
    let (mut cx, mut cy) = (x0, y0);

    for _ in 0..params.max_iterations.max(1) {
        let (mut a, mut b, mut c) = (0.0f64, 0.0f64, 0.0f64);
        let (mut bb1, mut bb2) = (0.0f64, 0.0f64);

        for dy in -win..=win {
            let wy = (-(dy as f64 * inv_win).powi(2)).exp();
            for dx in -win..=win {
                let wx = (-(dx as f64 * inv_win).powi(2)).exp();
                let m = wx * wy;

                let px = (cx + dx as f64) as f32;
                let py = (cy + dy as f64) as f32;
                let gx = 0.5 * (img.sample(px + 1.0, py) - img.sample(px - 1.0, py)) as f64;
                let gy = 0.5 * (img.sample(px, py + 1.0) - img.sample(px, py - 1.0)) as f64;

                let gxx = gx * gx * m;
                let gxy = gx * gy * m;
                let gyy = gy * gy * m;

                a += gxx;
                b += gxy;
                c += gyy;
                // Offsets relative to the current estimate keep the sums small.
                bb1 += gxx * dx as f64 + gxy * dy as f64;
                bb2 += gxy * dx as f64 + gyy * dy as f64;
            }
        }

        let det = a * c - b * b;
        if det.abs() <= f64::EPSILON * (a * c).abs().max(1.0) {
            break;
        }
        let ox = (c * bb1 - b * bb2) / det;
        let oy = (a * bb2 - b * bb1) / det;
        cx += ox;
        cy += oy;

        if ox * ox + oy * oy <= eps * eps {
            break;
        }
    }

    let win = win as f64;
    if !cx.is_finite() || !cy.is_finite() || (cx - x0).abs() > win || (cy - y0).abs() > win {
        return initial;
    }
    Point2::new(cx as f32, cy as f32)
}

/// Refine all corners in place.
pub fn refine_corners(
    img: &GrayImageView<'_>,
    points: &mut [Point2<f32>],
    half_window: u32,
    params: &SubPixParams,
) {
    for p in points.iter_mut() {
        *p = refine_corner(img, *p, half_window, params);
    }
}
