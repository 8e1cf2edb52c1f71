use crate::init::{estimate_focal, pose_from_homography, view_homographies};
use crate::model::{CameraIntrinsics, Distortion, Pose};
use crate::problem::{
    intrinsics_of, pose_offset, view_residuals, CalibrationProblem, CX, CY, INTRINSICS_LEN, K1,
    K2, P1, P2, POSE_LEN,
};
use crate::{Observation, ObservationSet, PatternGeometry};
use levenberg_marquardt::{LevenbergMarquardt, TerminationReason};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("no observations to calibrate from")]
    NoObservations,
    #[error("view {view}: expected {expected} points, got {got}")]
    PointCountMismatch {
        view: usize,
        expected: usize,
        got: usize,
    },
    #[error("view {view}: at least 4 points are required, got {count}")]
    TooFewPoints { view: usize, count: usize },
    #[error("invalid image size {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },
    #[error("view {view}: homography estimation failed")]
    HomographyFailed { view: usize },
    #[error("views do not constrain the focal length")]
    DegenerateIntrinsics,
    #[error("optimizer did not converge: {0}")]
    NotConverged(String),
    #[error("solution contains non-finite values")]
    NonFinite,
}

/// Knobs for the non-linear refinement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Keep `cx, cy` at the image centre.
    pub fix_principal_point: bool,
    /// Force `p1 = p2 = 0`.
    pub zero_tangential: bool,
    /// Force `k1 = k2 = 0`.
    pub fix_radial: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            fix_principal_point: false,
            zero_tangential: false,
            fix_radial: false,
        }
    }
}

/// Refined focal lengths must stay within this factor of the closed-form
/// estimate.
const MAX_FOCAL_DRIFT: f64 = 2.0;

impl SolveOptions {
    /// Intrinsic parameters the optimizer may move.
    ///
    /// A single view cannot separate the principal point and tangential
    /// distortion from the pose, so both stay fixed then.
    fn free_intrinsics(&self, view_count: usize) -> Vec<usize> {
        let single = view_count < 2;
        (0..INTRINSICS_LEN)
            .filter(|&i| match i {
                CX | CY => !(self.fix_principal_point || single),
                K1 | K2 => !self.fix_radial,
                P1 | P2 => !(self.zero_tangential || single),
                _ => true,
            })
            .collect()
    }
}

/// Refined pose and residual of one view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewResult {
    pub pose: Pose,
    pub rms_error: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// `sqrt(sum of squared reprojection errors / number of points)`, in pixels.
    pub rms_error: f64,
    pub intrinsics: CameraIntrinsics,
    pub distortion: Distortion,
    pub image_width: u32,
    pub image_height: u32,
    pub views: Vec<ViewResult>,
}

impl CalibrationResult {
    /// 3×3 camera matrix, 9 values row-major.
    pub fn camera_matrix(&self) -> [f64; 9] {
        self.intrinsics.to_row_major()
    }

    /// `k1, k2, p1, p2`.
    pub fn distortion_coeffs(&self) -> [f64; 4] {
        self.distortion.to_array()
    }
}

/// Calibrate from a collected set, regenerating object points from `geometry`.
///
/// The set is consumed; every view must carry exactly
/// `geometry.corner_count()` detections.
pub fn solve(
    set: ObservationSet,
    geometry: &PatternGeometry,
    image_width: u32,
    image_height: u32,
    options: &SolveOptions,
) -> Result<CalibrationResult, SolveError> {
    if set.is_empty() {
        return Err(SolveError::NoObservations);
    }
    if let Some(recorded) = set.image_size() {
        if recorded != (image_width, image_height) {
            warn!(
                "observations were recorded at {}x{}, solve requested {image_width}x{image_height}",
                recorded.0, recorded.1
            );
            return Err(SolveError::InvalidImageSize {
                width: image_width,
                height: image_height,
            });
        }
    }
    let expected = geometry.corner_count();
    let object_points = geometry.object_points();

    let views = set
        .into_observations()
        .into_iter()
        .enumerate()
        .map(|(view, obs)| {
            if obs.len() != expected {
                return Err(SolveError::PointCountMismatch {
                    view,
                    expected,
                    got: obs.len(),
                });
            }
            Observation::new(object_points.clone(), obs.image_points().to_vec()).map_err(|_| {
                SolveError::PointCountMismatch {
                    view,
                    expected,
                    got: obs.len(),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    calibrate(&views, image_width, image_height, options)
}

/// Reject a refinement whose focal lengths ran away from the closed-form
/// estimate along a direction the views do not constrain.
fn check_focal_drift(
    initial: &CameraIntrinsics,
    refined: &CameraIntrinsics,
) -> Result<(), SolveError> {
    let within = |init: f64, got: f64| {
        got > 0.0 && got <= init * MAX_FOCAL_DRIFT && got * MAX_FOCAL_DRIFT >= init
    };
    if within(initial.fx, refined.fx) && within(initial.fy, refined.fy) {
        return Ok(());
    }
    warn!(
        "refined focal lengths fx={:.2} fy={:.2} left the initial estimate fx={:.2} fy={:.2}",
        refined.fx, refined.fy, initial.fx, initial.fy
    );
    Err(SolveError::DegenerateIntrinsics)
}

/// Calibrate from explicit object/image correspondences.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(views, options), fields(view_count = views.len()))
)]
pub fn calibrate(
    views: &[Observation],
    image_width: u32,
    image_height: u32,
    options: &SolveOptions,
) -> Result<CalibrationResult, SolveError> {
    if views.is_empty() {
        return Err(SolveError::NoObservations);
    }
    if image_width == 0 || image_height == 0 {
        return Err(SolveError::InvalidImageSize {
            width: image_width,
            height: image_height,
        });
    }

    let cx = (image_width as f64 - 1.0) * 0.5;
    let cy = (image_height as f64 - 1.0) * 0.5;

    let homographies = view_homographies(views)?;
    let (fx, fy) = estimate_focal(&homographies, cx, cy)?;
    debug!("initial focal lengths fx={fx:.2} fy={fy:.2}");
    let initial = CameraIntrinsics::new(fx, fy, cx, cy);

    let mut full = vec![fx, fy, cx, cy, 0.0, 0.0, 0.0, 0.0];
    full.reserve(POSE_LEN * views.len());
    for (view, hom) in homographies.iter().enumerate() {
        let pose = pose_from_homography(&initial, hom).ok_or(SolveError::HomographyFailed { view })?;
        full.extend_from_slice(&pose.rvec);
        full.extend_from_slice(&pose.tvec);
    }

    let mut free = options.free_intrinsics(views.len());
    if views.len() < 2 {
        debug!("single view: principal point and tangential distortion held fixed");
    }
    free.extend(INTRINSICS_LEN..full.len());

    let lm = LevenbergMarquardt::new()
        .with_ftol(options.ftol)
        .with_xtol(options.xtol)
        .with_gtol(options.gtol)
        .with_patience(options.max_iterations.max(1));
    let (problem, report) = lm.minimize(CalibrationProblem::new(views, full, free));

    match &report.termination {
        t if t.was_successful() => {}
        // Already at the floating-point floor; the estimate is usable.
        TerminationReason::NoImprovementPossible(_) => {
            debug!("optimizer stopped at the numerical floor");
        }
        other => return Err(SolveError::NotConverged(format!("{other:?}"))),
    }

    let full = problem.full_params();
    if full.iter().any(|v| !v.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let (intrinsics, distortion) = intrinsics_of(full);
    check_focal_drift(&initial, &intrinsics)?;
    let mut total_sq = 0.0;
    let mut total_points = 0usize;
    let mut view_results = Vec::with_capacity(views.len());
    let mut residuals = Vec::new();
    for (view, obs) in views.iter().enumerate() {
        residuals.resize(2 * obs.len(), 0.0);
        view_residuals(full, view, obs, &mut residuals);
        let sq: f64 = residuals.iter().map(|r| r * r).sum();
        total_sq += sq;
        total_points += obs.len();

        let o = pose_offset(view);
        view_results.push(ViewResult {
            pose: Pose {
                rvec: [full[o], full[o + 1], full[o + 2]],
                tvec: [full[o + 3], full[o + 4], full[o + 5]],
            },
            rms_error: (sq / obs.len().max(1) as f64).sqrt(),
        });
    }
    let rms_error = (total_sq / total_points.max(1) as f64).sqrt();
    if !rms_error.is_finite() {
        return Err(SolveError::NonFinite);
    }

    info!(
        "calibrated {} views: rms={:.4}px fx={:.2} fy={:.2} cx={:.2} cy={:.2} ({} evaluations)",
        views.len(),
        rms_error,
        intrinsics.fx,
        intrinsics.fy,
        intrinsics.cx,
        intrinsics.cy,
        report.number_of_evaluations
    );

    Ok(CalibrationResult {
        rms_error,
        intrinsics,
        distortion,
        image_width,
        image_height,
        views: view_results,
    })
}
