//! Reprojection least-squares problem for the Levenberg–Marquardt backend.
//!
//! Parameter layout: `[fx, fy, cx, cy, k1, k2, p1, p2]` followed by one
//! `[rx, ry, rz, tx, ty, tz]` block per view. Only the free subset is
//! exposed to the optimizer; fixed entries keep their initial value.

use crate::model::{project_point, CameraIntrinsics, Distortion};
use crate::Observation;
use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn, Rotation3, Vector3};

pub(crate) const INTRINSICS_LEN: usize = 8;
pub(crate) const POSE_LEN: usize = 6;

pub(crate) const CX: usize = 2;
pub(crate) const CY: usize = 3;
pub(crate) const K1: usize = 4;
pub(crate) const K2: usize = 5;
pub(crate) const P1: usize = 6;
pub(crate) const P2: usize = 7;

pub(crate) fn intrinsics_of(full: &[f64]) -> (CameraIntrinsics, Distortion) {
    (
        CameraIntrinsics::new(full[0], full[1], full[CX], full[CY]),
        Distortion::new(full[K1], full[K2], full[P1], full[P2]),
    )
}

pub(crate) fn pose_offset(view: usize) -> usize {
    INTRINSICS_LEN + POSE_LEN * view
}

/// Write the `2 * n` residuals (projected minus observed) of one view.
pub(crate) fn view_residuals(full: &[f64], view: usize, obs: &Observation, out: &mut [f64]) {
    let (intrinsics, distortion) = intrinsics_of(full);
    let o = pose_offset(view);
    let rotation = Rotation3::from_scaled_axis(Vector3::new(full[o], full[o + 1], full[o + 2]));
    let translation = Vector3::new(full[o + 3], full[o + 4], full[o + 5]);

    for (k, (p, q)) in obs
        .object_points()
        .iter()
        .zip(obs.image_points())
        .enumerate()
    {
        let proj = project_point(&intrinsics, &distortion, &rotation, &translation, p);
        out[2 * k] = proj.x - q.x;
        out[2 * k + 1] = proj.y - q.y;
    }
}

pub(crate) struct CalibrationProblem<'a> {
    views: &'a [Observation],
    row_offsets: Vec<usize>,
    residual_len: usize,
    full: Vec<f64>,
    free: Vec<usize>,
    params: DVector<f64>,
}

impl<'a> CalibrationProblem<'a> {
    pub fn new(views: &'a [Observation], full: Vec<f64>, free: Vec<usize>) -> Self {
        let mut row_offsets = Vec::with_capacity(views.len());
        let mut rows = 0;
        for obs in views {
            row_offsets.push(rows);
            rows += 2 * obs.len();
        }
        let params = DVector::from_iterator(free.len(), free.iter().map(|&i| full[i]));
        Self {
            views,
            row_offsets,
            residual_len: rows,
            full,
            free,
            params,
        }
    }

    /// All parameters, fixed ones included.
    pub fn full_params(&self) -> &[f64] {
        &self.full
    }

    fn residuals_of(&self, full: &[f64]) -> DVector<f64> {
        let mut r = DVector::zeros(self.residual_len);
        for (view, obs) in self.views.iter().enumerate() {
            let start = self.row_offsets[view];
            let block = &mut r.as_mut_slice()[start..start + 2 * obs.len()];
            view_residuals(full, view, obs, block);
        }
        r
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for CalibrationProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.clone_from(x);
        for (k, &i) in self.free.iter().enumerate() {
            self.full[i] = x[k];
        }
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        Some(self.residuals_of(&self.full))
    }

    /// Central differences. A pose parameter only touches the rows of its
    /// own view, so those columns are evaluated on that view alone.
    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let mut jac = DMatrix::zeros(self.residual_len, self.free.len());
        let mut probe = self.full.clone();
        let mut plus = Vec::new();
        let mut minus = Vec::new();

        for (col, &i) in self.free.iter().enumerate() {
            let x = self.full[i];
            let h = 1e-6 * x.abs().max(1.0);
            let views = if i < INTRINSICS_LEN {
                0..self.views.len()
            } else {
                let v = (i - INTRINSICS_LEN) / POSE_LEN;
                v..v + 1
            };

            for view in views {
                let obs = &self.views[view];
                let n = 2 * obs.len();
                plus.resize(n, 0.0);
                minus.resize(n, 0.0);

                probe[i] = x + h;
                view_residuals(&probe, view, obs, &mut plus);
                probe[i] = x - h;
                view_residuals(&probe, view, obs, &mut minus);
                probe[i] = x;

                let start = self.row_offsets[view];
                for r in 0..n {
                    jac[(start + r, col)] = (plus[r] - minus[r]) / (2.0 * h);
                }
            }
        }
        Some(jac)
    }
}
