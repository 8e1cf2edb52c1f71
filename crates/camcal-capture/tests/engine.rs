use camcal_capture::{CameraError, CaptureConfig, CaptureEngine};
use camcal_core::Frame;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(grab_timeout_ms: u64, reconnect_delay_ms: u64) -> CaptureConfig {
    CaptureConfig {
        grab_timeout_ms,
        reconnect_delay_ms,
    }
}

/// Frame whose first pixel carries the low byte of `n`.
fn numbered_frame(n: u64) -> Frame {
    Frame::filled(8, 6, [(n % 256) as u8, 0, 0])
}

#[test]
fn grabs_are_fresh_and_stale_frames_are_dropped() {
    init_logging();
    let reads = Arc::new(AtomicU64::new(0));
    let connector = {
        let reads = Arc::clone(&reads);
        move |_: &str| -> Result<_, CameraError> {
            let reads = Arc::clone(&reads);
            Ok(move || -> Result<Frame, CameraError> {
                thread::sleep(Duration::from_millis(2));
                let n = reads.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(numbered_frame(n))
            })
        }
    };

    let engine = CaptureEngine::start(connector, "mock://fresh", config(2000, 10)).expect("start");

    let first = engine.try_grab().expect("first frame");
    thread::sleep(Duration::from_millis(100));
    let published_before = reads.load(Ordering::SeqCst);
    let second = engine.try_grab().expect("second frame");

    // Reads and sequence numbers stay in lock step while nothing fails.
    assert_eq!(second.pixel(0, 0).map(|p| p[0]), Some((second.sequence() % 256) as u8));
    assert!(second.sequence() > first.sequence());
    // Only the frame still in flight at grab time may be newer than what we saw.
    assert!(
        second.sequence() + 1 >= published_before,
        "stale frame {} after {} reads",
        second.sequence(),
        published_before
    );

    let stats = engine.stats();
    assert!(stats.dropped > 0, "expected dropped frames, got {stats:?}");
    assert_eq!(stats.read_failures, 0);
    assert_eq!(stats.reconnects, 0);
}

#[test]
fn grab_times_out_when_nothing_is_captured() {
    init_logging();
    let connector = |address: &str| -> Result<fn() -> Result<Frame, CameraError>, CameraError> {
        Err(CameraError::Open {
            address: address.to_string(),
            reason: "no such device".to_string(),
        })
    };
    let engine = CaptureEngine::start(connector, "mock://absent", config(80, 20)).expect("start");

    let started = Instant::now();
    assert!(engine.try_grab().is_none());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(80), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned late: {elapsed:?}");

    let stats = engine.stats();
    assert_eq!(stats.captured, 0);
    assert!(stats.read_failures >= 1);
}

#[test]
fn each_failure_is_followed_by_a_delayed_reconnect() {
    init_logging();
    const FAILURES: usize = 3;
    let delay = Duration::from_millis(40);

    let connects = Arc::new(Mutex::new(Vec::<Instant>::new()));
    let remaining_failures = Arc::new(AtomicUsize::new(FAILURES));
    let connector = {
        let connects = Arc::clone(&connects);
        let remaining_failures = Arc::clone(&remaining_failures);
        move |_: &str| -> Result<_, CameraError> {
            connects.lock().expect("connect log").push(Instant::now());
            let remaining_failures = Arc::clone(&remaining_failures);
            Ok(move || -> Result<Frame, CameraError> {
                let left = remaining_failures.load(Ordering::SeqCst);
                if left > 0 {
                    remaining_failures.store(left - 1, Ordering::SeqCst);
                    return Err(CameraError::Read("cable unplugged".to_string()));
                }
                thread::sleep(Duration::from_millis(5));
                Ok(numbered_frame(0))
            })
        }
    };

    let engine = CaptureEngine::start(connector, "mock://flaky", config(5000, 40)).expect("start");
    let frame = engine.try_grab().expect("delivery resumes");
    assert_eq!(frame.sequence(), 1);

    let stats = engine.stats();
    assert_eq!(stats.read_failures, FAILURES as u64);
    assert_eq!(stats.reconnects, FAILURES as u64);

    let times = connects.lock().expect("connect log").clone();
    assert_eq!(times.len(), FAILURES + 1, "initial connect plus one per failure");
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= delay, "reconnects spaced {:?}", pair[1] - pair[0]);
    }
}

#[test]
fn failed_initial_connect_recovers() {
    init_logging();
    let attempts = Arc::new(AtomicUsize::new(0));
    let connector = {
        let attempts = Arc::clone(&attempts);
        move |address: &str| -> Result<_, CameraError> {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(CameraError::Open {
                    address: address.to_string(),
                    reason: "busy".to_string(),
                });
            }
            Ok(|| -> Result<Frame, CameraError> {
                thread::sleep(Duration::from_millis(5));
                Ok(numbered_frame(7))
            })
        }
    };

    let engine = CaptureEngine::start(connector, "mock://busy", config(3000, 10)).expect("start");
    let frame = engine.try_grab().expect("frame after reconnect");
    assert_eq!(frame.pixel(0, 0), Some([7, 0, 0]));
    assert!(engine.stats().reconnects >= 1);
}

#[test]
fn drop_interrupts_the_reconnect_pause() {
    init_logging();
    let connector = |_: &str| -> Result<_, CameraError> {
        Ok(|| -> Result<Frame, CameraError> { Err(CameraError::Read("dead".to_string())) })
    };
    let engine =
        CaptureEngine::start(connector, "mock://dead", config(100, 60_000)).expect("start");
    assert!(engine.is_running());
    thread::sleep(Duration::from_millis(30));

    let started = Instant::now();
    drop(engine);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn explicit_shutdown_joins_the_thread() {
    init_logging();
    let connector = |_: &str| -> Result<_, CameraError> {
        Ok(|| -> Result<Frame, CameraError> {
            thread::sleep(Duration::from_millis(1));
            Ok(numbered_frame(1))
        })
    };
    let engine = CaptureEngine::start(connector, "mock://stop", CaptureConfig::default())
        .expect("start");
    assert!(engine.try_grab().is_some());
    engine.shutdown();
}
