//! Tracing subscriber setup
//!
//! Everything is written to a log file; the terminal belongs to the
//! prompt and to evaluation results.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber with file logging.
///
/// `verbosity` is the number of `-v` flags: 0 keeps the DEBUG default,
/// anything higher enables TRACE. `RUST_LOG` directives still apply.
pub fn init_global(log_file: File, verbosity: u8) {
    build_subscriber(log_file, verbosity).init();
}

/// Create the log file at `preferred`, or at `fallback` when that fails.
///
/// Returns the open file and the path actually used, or `None` when
/// neither location is writable.
pub fn open_log_file(preferred: &Path, fallback: &Path) -> Option<(File, PathBuf)> {
    [preferred, fallback]
        .into_iter()
        .find_map(|path| File::create(path).ok().map(|file| (file, path.to_path_buf())))
}

/// Build a subscriber writing to `log_file`.
///
/// This is the configuration shared between production and tests.
pub fn build_subscriber(log_file: File, verbosity: u8) -> impl tracing::Subscriber + Send + Sync {
    let level = if verbosity > 0 {
        tracing::Level::TRACE
    } else {
        tracing::Level::DEBUG
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
