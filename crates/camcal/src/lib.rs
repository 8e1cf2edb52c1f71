//! Live camera calibration: capture, checkerboard detection, intrinsic
//! calibration and undistortion.
//!
//! This crate provides:
//! - re-exports of the underlying crates under short module names,
//! - [`CalibrationPipeline`], which turns grabbed frames into a calibration,
//! - flat-array entry points in [`boundary`],
//! - JSON session config and result persistence in [`io`],
//! - ray-traced test scenes in [`synthetic`].
//!
//! ## Quickstart
//!
//! ```no_run
//! use camcal::capture::{CaptureConfig, CaptureEngine, ImageSequenceConnector};
//! use camcal::{rectify, CalibrationPipeline, PatternGeometry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CaptureEngine::start(
//!     ImageSequenceConnector::new(),
//!     "captures/",
//!     CaptureConfig::default(),
//! )?;
//! let mut pipeline = CalibrationPipeline::new(PatternGeometry::new(9, 6, 25.0)?);
//!
//! while pipeline.len() < 15 {
//!     let Some(mut frame) = engine.try_grab() else { break };
//!     pipeline.add_observation(&mut frame);
//! }
//! let result = pipeline.solve()?;
//! println!("rms = {:.3}px", result.rms_error);
//!
//! if let Some(frame) = engine.try_grab() {
//!     let undistorted = rectify(&frame, &result);
//!     println!("{}x{}", undistorted.width(), undistorted.height());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `camcal::core`: frames, grayscale views, homographies, logging.
//! - `camcal::capture`: capture engine, frame slot, camera traits.
//! - `camcal::chessboard`: checkerboard corner detection.
//! - `camcal::calib`: pattern geometry, solver, undistortion.

pub use camcal_calib as calib;
pub use camcal_capture as capture;
pub use camcal_chessboard as chessboard;
pub use camcal_core as core;

pub use camcal_calib::{
    rectify, solve, CalibrationResult, Observation, ObservationSet, PatternGeometry, SolveError,
    SolveOptions, UndistortMap,
};
pub use camcal_core::Frame;

pub mod boundary;
pub mod io;
mod pipeline;
pub mod synthetic;

pub use pipeline::{detect_pattern, CalibrationPipeline};
