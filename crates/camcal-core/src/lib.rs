//! Shared types for live camera calibration.
//!
//! This crate holds the owned [`Frame`] buffer that travels from the capture
//! thread to the caller, lightweight grayscale views used by the detector,
//! and the planar geometry helpers (homographies, integer grid transforms)
//! shared by detection and calibration.

mod corner;
mod frame;
mod gray;
mod grid;
mod homography;
mod logger;

pub use corner::{Corner, GridCoords, LabeledCorner};
pub use frame::{Frame, FrameError};
pub use gray::{GrayImage, GrayImageView};
pub use grid::{GridBounds, GridTransform, GRID_ROTATIONS};
pub use homography::{estimate_homography, Homography};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
