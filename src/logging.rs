//! Logging setup for the binaries.
//!
//! The CLI logs to stderr. The MCP server owns stdout for the protocol, so it
//! logs to a file under the data directory instead, rotated once it grows
//! past [`MAX_LOG_SIZE`].

use std::fs::{self, File, OpenOptions};
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

/// Maximum log file size before rotation (1MB).
pub const MAX_LOG_SIZE: u64 = 1_048_576;

/// Level used when neither `RUST_LOG` nor a flag chooses one.
pub const DEFAULT_LEVEL: &str = "warn";

/// Build the filter: `RUST_LOG` if set, otherwise `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize logging to stderr.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_stderr(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();
    let _ = subscriber.try_init();
}

/// Initialize logging to the file at `path` and install the panic hook.
///
/// # Errors
///
/// Returns an error if the log file cannot be created.
pub fn init_file(path: &Path, level: &str) -> std::io::Result<()> {
    let file = open_log(path)?;
    let _ = tracing::subscriber::set_global_default(file_subscriber(file, level));
    install_panic_hook();
    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}

/// Build a subscriber that writes plain lines to `file`.
pub fn file_subscriber(file: File, level: &str) -> impl Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish()
}

/// Open `path` for appending, rotating it to `.log.old` first if too large.
///
/// # Errors
///
/// Returns an error if the parent directory or the file cannot be created.
pub fn open_log(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if fs::metadata(path).is_ok_and(|m| m.len() > MAX_LOG_SIZE) {
        let _ = fs::rename(path, path.with_extension("log.old"));
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Record panics through `tracing` before the default hook runs.
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()),
        );
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        tracing::error!(%location, "panic: {payload}");

        original_hook(info);
    }));
}
