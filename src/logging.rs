//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Keeps stdout free for JSON output
    Stderr,
}

/// Installs a compact fmt subscriber. `RUST_LOG` wins over `default_level`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init(default_level: &str, target: LogTarget) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let _ = match target {
        LogTarget::Stdout => builder.try_init(),
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
    };
}
