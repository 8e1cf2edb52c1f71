//! Live camera capture with a freshest-frame hand-off.
//!
//! A [`CaptureEngine`] owns one producer thread that reads a [`Camera`]
//! continuously and publishes every frame into a single-slot [`FrameSlot`].
//! Consumers grab with a timeout and always receive the newest frame; older
//! unclaimed frames are dropped. Failed reads trigger a delayed reconnect.
//!
//! ```no_run
//! use camcal_capture::{CaptureConfig, CaptureEngine, ImageSequenceConnector};
//!
//! let connector = ImageSequenceConnector::new().looping(true);
//! let engine = CaptureEngine::start(connector, "frames/", CaptureConfig::default())?;
//! if let Some(frame) = engine.try_grab() {
//!     println!("frame #{} {}x{}", frame.sequence(), frame.width(), frame.height());
//! }
//! # Ok::<(), camcal_capture::CaptureError>(())
//! ```

mod camera;
mod engine;
mod sequence;
mod slot;

pub use camcal_core::Frame;
pub use camera::{Camera, CameraConnector, CameraError};
pub use engine::{CaptureConfig, CaptureEngine, CaptureError, CaptureStats};
pub use sequence::{ImageSequenceCamera, ImageSequenceConnector};
pub use slot::{FrameSlot, SlotCounts};
