use camcal_core::{Frame, FrameError};

/// Errors raised by camera backends.
///
/// The capture engine never surfaces these to the consumer: every failed read
/// is logged and followed by a reconnect.
#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("camera at {address:?} is not connected")]
    Disconnected { address: String },

    #[error("failed to open camera at {address:?}: {reason}")]
    Open { address: String, reason: String },

    #[error("camera read failed: {0}")]
    Read(String),

    #[error("end of stream")]
    EndOfStream,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// An open video source yielding one frame per `read`.
pub trait Camera: Send {
    /// Block until the next frame is available.
    fn read(&mut self) -> Result<Frame, CameraError>;
}

impl<F> Camera for F
where
    F: FnMut() -> Result<Frame, CameraError> + Send,
{
    fn read(&mut self) -> Result<Frame, CameraError> {
        self()
    }
}

/// Opens cameras from an address (device index, URL, directory, ...).
///
/// The engine calls `connect` once at start and again after every failed read,
/// always with the original address.
pub trait CameraConnector: Send + 'static {
    type Camera: Camera;

    fn connect(&self, address: &str) -> Result<Self::Camera, CameraError>;
}

impl<F, C> CameraConnector for F
where
    F: Fn(&str) -> Result<C, CameraError> + Send + 'static,
    C: Camera,
{
    type Camera = C;

    fn connect(&self, address: &str) -> Result<C, CameraError> {
        self(address)
    }
}
