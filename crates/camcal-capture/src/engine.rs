//! Background capture thread feeding a [`FrameSlot`].

use crate::camera::{Camera, CameraConnector, CameraError};
use crate::slot::FrameSlot;
use camcal_core::Frame;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const THREAD_NAME: &str = "camcal-capture";

/// Timing knobs of a [`CaptureEngine`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Timeout applied by [`CaptureEngine::try_grab`].
    pub grab_timeout_ms: u64,
    /// Pause between a failed read and the reconnect attempt.
    pub reconnect_delay_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            grab_timeout_ms: 500,
            reconnect_delay_ms: 1000,
        }
    }
}

impl CaptureConfig {
    pub fn grab_timeout(&self) -> Duration {
        Duration::from_millis(self.grab_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Snapshot of the engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    /// Successful reads.
    pub captured: u64,
    /// Frames replaced in the slot before the consumer grabbed them.
    pub dropped: u64,
    pub read_failures: u64,
    pub reconnects: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),
}

struct Shared {
    slot: FrameSlot<Frame>,
    shutdown: AtomicBool,
    captured: AtomicU64,
    read_failures: AtomicU64,
    reconnects: AtomicU64,
}

/// Either an open camera or the explicit "disconnected" state.
///
/// Reads from the disconnected state fail, which routes the producer loop
/// into its reconnect path.
enum Connection<C> {
    Connected(C),
    Disconnected,
}

impl<C: Camera> Connection<C> {
    fn open<K>(connector: &K, address: &str) -> Self
    where
        K: CameraConnector<Camera = C>,
    {
        match connector.connect(address) {
            Ok(camera) => {
                debug!("connected to camera {address:?}");
                Connection::Connected(camera)
            }
            Err(err) => {
                warn!("failed to connect to camera {address:?}: {err}");
                Connection::Disconnected
            }
        }
    }

    fn read(&mut self, address: &str) -> Result<Frame, CameraError> {
        match self {
            Connection::Connected(camera) => camera.read(),
            Connection::Disconnected => Err(CameraError::Disconnected {
                address: address.to_string(),
            }),
        }
    }
}

/// Continuously reads a camera on a dedicated thread and keeps only the
/// freshest unclaimed frame.
///
/// Read failures never reach the consumer: the producer pauses for the
/// reconnect delay, reopens the camera from the original address and keeps
/// going. Dropping the engine stops the thread and joins it. A read already
/// in progress is not interrupted, so shutdown waits for it to return.
pub struct CaptureEngine {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
    address: String,
    config: CaptureConfig,
}

impl CaptureEngine {
    /// Connect once on the calling thread and spawn the capture thread.
    ///
    /// A failed initial connect is not an error; the engine starts
    /// disconnected and recovers through its reconnect loop.
    pub fn start<K>(
        connector: K,
        address: impl Into<String>,
        config: CaptureConfig,
    ) -> Result<Self, CaptureError>
    where
        K: CameraConnector,
    {
        let address = address.into();
        let connection = Connection::open(&connector, &address);

        let shared = Arc::new(Shared {
            slot: FrameSlot::new(),
            shutdown: AtomicBool::new(false),
            captured: AtomicU64::new(0),
            read_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        });

        let worker = {
            let shared = Arc::clone(&shared);
            let address = address.clone();
            let reconnect_delay = config.reconnect_delay();
            thread::Builder::new()
                .name(THREAD_NAME.to_string())
                .spawn(move || {
                    produce(connector, &address, connection, &shared, reconnect_delay)
                })
                .map_err(CaptureError::Spawn)?
        };

        info!("capture engine started for {address:?}");
        Ok(Self {
            shared,
            worker: Some(worker),
            address,
            config,
        })
    }

    /// Grab the freshest frame, waiting up to the configured timeout.
    pub fn try_grab(&self) -> Option<Frame> {
        self.try_grab_timeout(self.config.grab_timeout())
    }

    /// Grab the freshest frame, waiting up to `timeout`.
    ///
    /// The returned frame is never older than the latest frame published
    /// before the call; `None` means nothing arrived in time.
    pub fn try_grab_timeout(&self, timeout: Duration) -> Option<Frame> {
        self.shared.slot.try_grab(timeout)
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            captured: self.shared.captured.load(Ordering::Relaxed),
            dropped: self.shared.slot.counts().overwritten,
            read_failures: self.shared.read_failures.load(Ordering::Relaxed),
            reconnects: self.shared.reconnects.load(Ordering::Relaxed),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// True while the capture thread is alive.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stop the capture thread and wait for it to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.shared.shutdown.store(true, Ordering::Release);
        worker.thread().unpark();
        if worker.join().is_err() {
            warn!("capture thread for {:?} panicked", self.address);
        }
        let stats = self.stats();
        info!(
            "capture engine for {:?} stopped: {} captured, {} dropped, {} reconnects",
            self.address, stats.captured, stats.dropped, stats.reconnects
        );
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureEngine")
            .field("address", &self.address)
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Sleep until `delay` has passed or shutdown is requested.
///
/// Returns `false` when interrupted by shutdown.
fn pause(shutdown: &AtomicBool, delay: Duration) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if shutdown.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::park_timeout(deadline - now);
    }
}

fn produce<K>(
    connector: K,
    address: &str,
    mut connection: Connection<K::Camera>,
    shared: &Shared,
    reconnect_delay: Duration,
) where
    K: CameraConnector,
{
    let mut sequence = 0u64;
    loop {
        match connection.read(address) {
            Ok(mut frame) => {
                sequence += 1;
                frame.set_sequence(sequence);
                shared.captured.fetch_add(1, Ordering::Relaxed);
                shared.slot.publish(frame);
            }
            Err(err) => {
                shared.read_failures.fetch_add(1, Ordering::Relaxed);
                warn!("read from camera {address:?} failed: {err}; reconnecting in {reconnect_delay:?}");
                if !pause(&shared.shutdown, reconnect_delay) {
                    break;
                }
                // Release the old device before reopening it.
                drop(connection);
                connection = Connection::open(&connector, address);
                shared.reconnects.fetch_add(1, Ordering::Relaxed);
            }
        }

        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }
    }
    debug!("capture thread for {address:?} exiting after {sequence} frames");
}
