//! Plane-to-plane projective transforms.

use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// `dst ~ h * src` in homogeneous coordinates, normalized to `h[(2, 2)] = 1`
/// when estimated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let q = self.h * Vector3::new(p.x, p.y, 1.0);
        Point2::new(q.x / q.z, q.y / q.z)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    /// Root-mean-square transfer error `|H src - dst|` over the pairs.
    pub fn transfer_rms(&self, src: &[Point2<f64>], dst: &[Point2<f64>]) -> f64 {
        let n = src.len().min(dst.len());
        if n == 0 {
            return 0.0;
        }
        let sq: f64 = src
            .iter()
            .zip(dst)
            .map(|(s, d)| (self.apply(*s) - *d).norm_squared())
            .sum();
        (sq / n as f64).sqrt()
    }
}

/// Similarity moving a point set to zero mean and mean radius `sqrt(2)`.
struct Conditioner {
    t: Matrix3<f64>,
}

impl Conditioner {
    fn for_points(pts: &[Point2<f64>]) -> Self {
        let n = pts.len() as f64;
        let centroid = pts.iter().fold(Vector3::zeros(), |acc, p| {
            acc + Vector3::new(p.x, p.y, 0.0)
        }) / n;
        let mean_radius = pts
            .iter()
            .map(|p| (p.x - centroid.x).hypot(p.y - centroid.y))
            .sum::<f64>()
            / n;
        let s = if mean_radius > 1e-12 {
            std::f64::consts::SQRT_2 / mean_radius
        } else {
            1.0
        };
        Self {
            t: Matrix3::new(
                s, 0.0, -s * centroid.x, //
                0.0, s, -s * centroid.y, //
                0.0, 0.0, 1.0,
            ),
        }
    }

    #[inline]
    fn apply(&self, p: &Point2<f64>) -> (f64, f64) {
        let s = self.t[(0, 0)];
        (s * p.x + self.t[(0, 2)], s * p.y + self.t[(1, 2)])
    }
}

/// Estimate `H` with `dst ~ H * src` from at least 4 correspondences using
/// the conditioned direct linear transform.
///
/// `None` for mismatched or too short inputs and for degenerate
/// configurations (e.g. collinear points).
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Homography> {
    let n = src.len();
    if n != dst.len() || n < 4 {
        return None;
    }
    let cs = Conditioner::for_points(src);
    let cd = Conditioner::for_points(dst);

    // Two rows per pair; padded to 9 rows so the SVD yields a full V.
    let mut a = DMatrix::<f64>::zeros((2 * n).max(9), 9);
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = cs.apply(s);
        let (u, v) = cd.apply(d);
        let r = 2 * k;
        a.row_mut(r)
            .copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u]);
        a.row_mut(r + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v]);
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t?;
    let (smallest, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    // the null space must be one-dimensional
    let mut sorted: Vec<f64> = svd.singular_values.iter().copied().collect();
    sorted.sort_by(f64::total_cmp);
    if sorted[1] <= 1e-12 * sorted[8].max(1e-300) {
        return None;
    }

    let h = v_t.row(smallest);
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    let h = cd.t.try_inverse()? * hn * cs.t;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 || !scale.is_finite() {
        return None;
    }
    Some(Homography::new(h / scale))
}
