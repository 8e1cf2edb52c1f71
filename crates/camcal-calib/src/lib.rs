//! Planar intrinsic calibration and undistortion.
//!
//! Pipeline:
//! 1. per-view board-to-image homographies (normalized DLT),
//! 2. focal lengths from the homography constraints with the principal point
//!    at the image centre, then a board pose per view,
//! 3. Levenberg–Marquardt refinement of `fx, fy, cx, cy, k1, k2, p1, p2` and
//!    all poses against the reprojection error.
//!
//! [`rectify`] and [`UndistortMap`] remove the fitted distortion from frames.
//!
//! ```no_run
//! use camcal_calib::{solve, Observation, ObservationSet, PatternGeometry, SolveOptions};
//! # fn detections() -> Vec<Vec<nalgebra::Point2<f32>>> { Vec::new() }
//!
//! let geometry = PatternGeometry::new(9, 6, 25.0)?;
//! let mut set = ObservationSet::new();
//! for corners in detections() {
//!     set.push(Observation::from_detection(&geometry, &corners)?, 640, 480)?;
//! }
//! let result = solve(set, &geometry, 640, 480, &SolveOptions::default())?;
//! println!("rms = {:.3}px, K = {:?}", result.rms_error, result.camera_matrix());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod geometry;
mod init;
mod model;
mod observation;
mod problem;
mod solve;
mod undistort;

pub use geometry::{GeometryError, PatternGeometry};
pub use init::{estimate_focal, pose_from_homography, view_homographies};
pub use model::{project_point, CameraIntrinsics, Distortion, Pose};
pub use observation::{Observation, ObservationError, ObservationSet};
pub use solve::{calibrate, solve, CalibrationResult, SolveError, SolveOptions, ViewResult};
pub use undistort::{rectify, rectify_with, UndistortMap};
