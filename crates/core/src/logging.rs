use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Overrides `RUST_LOG` for mapscope processes only.
pub const LOG_ENV: &str = "MAPSCOPE_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

/// `~/.mapscope/logs`, or `./.mapscope/logs` without a home directory.
pub fn log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mapscope")
        .join("logs")
}

/// Parses a filter directive; anything unparsable means `info`.
fn filter_from(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Sets up the global subscriber for one mapscope process.
///
/// Events go to `<log_dir>/<component>.log.<date>`, and also to stderr when
/// `to_stderr` is set. A second call in the same process is a no-op.
/// Dropping the returned guard flushes and stops the file writer.
pub fn init_logging(component: &str, to_stderr: bool) -> WorkerGuard {
    let dir = log_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("mapscope: cannot create {}: {}", dir.display(), e);
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, component));

    let directive = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();

    let stderr = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let _ = tracing_subscriber::registry()
        .with(filter_from(directive.as_deref()))
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(stderr)
        .try_init();

    guard
}
