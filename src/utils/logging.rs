use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Install the global subscriber: a daily rolling file under `logs_dir`, plus
/// stderr when `verbose` is set. The returned guard must live until exit so
/// buffered lines are flushed.
pub fn enable_logging(logs_dir: &Path, verbose: bool) -> std::io::Result<WorkerGuard> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(7)
        .filename_prefix("rclockin")
        .filename_suffix("log")
        .build(logs_dir)
        .map_err(std::io::Error::other)?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let stderr = std::io::stderr.with_filter(move |_| verbose);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with_ansi(false)
        .with_writer(stderr.and(file_writer))
        .try_init()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    Ok(guard)
}

/// `RUST_LOG` when it holds valid directives, otherwise `info` for this crate only.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| {
            EnvFilter::new(format!("{}=info", env!("CARGO_PKG_NAME").replace('-', "_")))
        })
}

#[cfg(test)]
pub static TEST_LOGGING: std::sync::LazyLock<()> = std::sync::LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::level_filters::LevelFilter::TRACE)
        .with_test_writer()
        .try_init();
});
