//! Flat-array entry points for callers that exchange plain buffers.
//!
//! Layouts: points are interleaved `x0, y0, x1, y1, ...`; the camera matrix
//! is 9 values row-major; distortion is exactly `k1, k2, p1, p2`. Length
//! violations are reported as [`BoundaryError`] and are meant to be treated
//! as fatal by the caller.

use crate::calib::{
    rectify_with, solve, CameraIntrinsics, Distortion, Observation, ObservationError,
    ObservationSet, PatternGeometry, SolveError, SolveOptions,
};
use camcal_core::Frame;
use nalgebra::Point2;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BoundaryError {
    #[error("view {view}: interleaved point buffer has odd length {len}")]
    OddPointBuffer { view: usize, len: usize },
    #[error("camera matrix must have 9 values, got {0}")]
    CameraMatrixLength(usize),
    #[error("distortion must have 4 values, got {0}")]
    DistortionLength(usize),
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Interleave points as `x0, y0, x1, y1, ...`.
pub fn flatten_points(points: &[Point2<f32>]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Inverse of [`flatten_points`].
pub fn unflatten_points(flat: &[f32]) -> Option<Vec<Point2<f32>>> {
    if flat.len() % 2 != 0 {
        return None;
    }
    Some(
        flat.chunks_exact(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect(),
    )
}

/// Calibrate from per-view interleaved corner buffers.
///
/// Returns `(rms, [k1, k2, p1, p2], camera matrix row-major)`.
pub fn compute_calibration(
    views: &[Vec<f32>],
    geometry: &PatternGeometry,
    image_width: u32,
    image_height: u32,
) -> Result<(f64, [f64; 4], [f64; 9]), BoundaryError> {
    let expected = geometry.corner_count();
    let mut set = ObservationSet::new();
    for (view, flat) in views.iter().enumerate() {
        let corners = unflatten_points(flat).ok_or(BoundaryError::OddPointBuffer {
            view,
            len: flat.len(),
        })?;
        if corners.len() != expected {
            return Err(SolveError::PointCountMismatch {
                view,
                expected,
                got: corners.len(),
            }
            .into());
        }
        set.push(
            Observation::from_detection(geometry, &corners)?,
            image_width,
            image_height,
        )?;
    }

    let result = solve(
        set,
        geometry,
        image_width,
        image_height,
        &SolveOptions::default(),
    )?;
    Ok((
        result.rms_error,
        result.distortion_coeffs(),
        result.camera_matrix(),
    ))
}

/// Undistort `frame` with a row-major camera matrix and `k1, k2, p1, p2`.
pub fn undistort(
    frame: &Frame,
    camera_matrix: &[f64],
    distortion: &[f64],
) -> Result<Frame, BoundaryError> {
    let intrinsics = CameraIntrinsics::from_row_major(camera_matrix)
        .ok_or(BoundaryError::CameraMatrixLength(camera_matrix.len()))?;
    let distortion =
        Distortion::from_slice(distortion).ok_or(BoundaryError::DistortionLength(distortion.len()))?;
    Ok(rectify_with(frame, &intrinsics, &distortion))
}
