//! Tracing subscriber setup for the binary
//!
//! Level filtering follows `RUST_LOG` and defaults to `warn`. The TUI owns the
//! terminal, so while it runs events only go to a log file when one is given.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log events are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget<'a> {
    File(&'a Path),
    Stderr,
    Off,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber
pub fn init(target: LogTarget<'_>) -> io::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    let result = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_line_number(true)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        LogTarget::Stderr => registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .try_init(),
    };

    result.map_err(|e| io::Error::other(format!("failed to initialize tracing subscriber: {e}")))?;
    tracing::debug!(?target, "logging initialized");
    Ok(())
}
