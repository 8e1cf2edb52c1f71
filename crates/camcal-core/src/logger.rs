//! Logging setup.
//!
//! The library crates only emit through the `log` facade. Binaries pick a
//! sink: [`init_with_level`] installs a small stderr logger whose lines read
//! `[  12.345s  WARN camcal-capture camcal_capture::engine] message`, so
//! records from the capture thread are told apart from the caller's.

use log::{LevelFilter, Log, Metadata, Record};
use std::io::Write;
use std::sync::OnceLock;
use std::thread;
use std::time::Instant;

static STDERR_LOGGER: OnceLock<StderrLogger> = OnceLock::new();

struct StderrLogger {
    max_level: LevelFilter,
    epoch: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let current = thread::current();
        let thread_name = current.name().unwrap_or("-");
        let line = format!(
            "[{:9.3}s {:>5} {} {}] {}\n",
            self.epoch.elapsed().as_secs_f64(),
            record.level(),
            thread_name,
            record.target(),
            record.args()
        );
        // single write per record
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Install the stderr logger at `level`.
///
/// Only the first call installs anything; later calls return `Ok(())`.
/// Fails if a different logger was already registered.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if STDERR_LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = STDERR_LOGGER.get_or_init(|| StderrLogger {
        max_level: level,
        epoch: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Route `log` records and `tracing` spans to a `tracing-subscriber` sink
/// filtered by `RUST_LOG` (default `info`).
///
/// Span close events report the time spent in detection, solving and
/// rectification. `json` switches to one JSON object per line.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt::{self, format::FmtSpan};
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_thread_names(true);
    // an already installed subscriber wins
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
