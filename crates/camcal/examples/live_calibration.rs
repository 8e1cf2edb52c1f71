//! Calibrate a camera from a live capture session described by a JSON config.
//!
//! ```text
//! cargo run -p camcal --example live_calibration -- session.json
//! ```

use camcal::capture::CaptureEngine;
use camcal::io::{save_calibration, SessionConfig};
use log::{info, warn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    camcal::core::init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    camcal::core::init_with_level(log::LevelFilter::Info)?;

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: live_calibration <session.json>");
        return Ok(());
    };

    let config = SessionConfig::load_json(path)?;
    let engine = CaptureEngine::start(
        config.sequence.clone(),
        config.camera_address.clone(),
        config.capture.clone(),
    )?;
    let mut pipeline = config.build_pipeline();

    let mut misses = 0;
    while pipeline.len() < config.min_views {
        let Some(mut frame) = engine.try_grab() else {
            misses += 1;
            if misses > 20 {
                warn!("no frames arriving, stopping with {} views", pipeline.len());
                break;
            }
            continue;
        };
        misses = 0;
        if pipeline.add_observation(&mut frame) {
            info!("view {}/{}", pipeline.len(), config.min_views);
        }
    }
    let stats = engine.stats();
    engine.shutdown();
    info!(
        "capture: {} frames, {} dropped, {} reconnects",
        stats.captured, stats.dropped, stats.reconnects
    );

    let result = pipeline.solve()?;
    println!(
        "rms {:.4}px  fx {:.2}  fy {:.2}  cx {:.2}  cy {:.2}  k {:?}",
        result.rms_error,
        result.intrinsics.fx,
        result.intrinsics.fy,
        result.intrinsics.cx,
        result.intrinsics.cy,
        result.distortion_coeffs()
    );
    save_calibration(&result, config.output_path())?;
    Ok(())
}
