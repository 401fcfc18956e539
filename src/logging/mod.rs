// Logging setup
//
// Human-readable logs go to stderr so they never interleave with the shell's
// stdout rendering. File logging is optional and writes JSON lines through a
// non-blocking rolling appender.
//
// Precedence: RUST_LOG env var > config level > default

use crate::config::{LogRotation, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when RUST_LOG is not set
pub fn default_directive(config: &LoggingConfig) -> String {
    format!("chesslens={}", config.level)
}

fn file_appender(config: &LoggingConfig) -> RollingFileAppender {
    match config.file_rotation {
        LogRotation::Hourly => {
            tracing_appender::rolling::hourly(&config.file_dir, &config.file_prefix)
        }
        LogRotation::Daily => {
            tracing_appender::rolling::daily(&config.file_dir, &config.file_prefix)
        }
        LogRotation::Never => {
            tracing_appender::rolling::never(&config.file_dir, &config.file_prefix)
        }
    }
}

/// Install the global subscriber
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// duration of the program.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive(config).into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let mut guard = None;
    let file_layer = if config.file_enabled {
        match std::fs::create_dir_all(&config.file_dir) {
            Ok(()) => {
                // Writes happen on a background thread
                let (non_blocking, worker) = tracing_appender::non_blocking(file_appender(config));
                guard = Some(worker);
                Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_ansi(false),
                )
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    config.file_dir, e
                );
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}
