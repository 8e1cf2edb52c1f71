//! Directory-of-images camera backend.

use crate::camera::{Camera, CameraConnector, CameraError};
use camcal_core::Frame;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Opens a directory of image files as a camera.
///
/// Files are played in lexical order. Reaching the end is a read failure
/// unless `looping` is set, so a capture engine restarts the sequence
/// through its reconnect path.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSequenceConnector {
    pub looping: bool,
    /// Minimum spacing between frames; `None` reads as fast as files decode.
    pub frame_interval_ms: Option<u64>,
}

impl ImageSequenceConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = Some(u64::try_from(interval.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

pub struct ImageSequenceCamera {
    paths: Vec<PathBuf>,
    next: usize,
    looping: bool,
    interval: Option<Duration>,
    last_emit: Option<Instant>,
}

impl ImageSequenceCamera {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

impl CameraConnector for ImageSequenceConnector {
    type Camera = ImageSequenceCamera;

    fn connect(&self, address: &str) -> Result<ImageSequenceCamera, CameraError> {
        let paths = list_images(Path::new(address)).map_err(|e| CameraError::Open {
            address: address.to_string(),
            reason: e.to_string(),
        })?;
        if paths.is_empty() {
            return Err(CameraError::Open {
                address: address.to_string(),
                reason: "directory contains no images".to_string(),
            });
        }
        debug!("opened image sequence {address:?} with {} frames", paths.len());
        Ok(ImageSequenceCamera {
            paths,
            next: 0,
            looping: self.looping,
            interval: self.frame_interval_ms.map(Duration::from_millis),
            last_emit: None,
        })
    }
}

impl Camera for ImageSequenceCamera {
    fn read(&mut self) -> Result<Frame, CameraError> {
        if self.next >= self.paths.len() {
            if !self.looping || self.paths.is_empty() {
                return Err(CameraError::EndOfStream);
            }
            self.next = 0;
        }

        if let (Some(interval), Some(last)) = (self.interval, self.last_emit) {
            let due = last + interval;
            let now = Instant::now();
            if due > now {
                thread::sleep(due - now);
            }
        }

        let path = &self.paths[self.next];
        self.next += 1;
        let image = image::open(path)?.to_rgb8();
        self.last_emit = Some(Instant::now());
        Ok(Frame::from_image(image))
    }
}
