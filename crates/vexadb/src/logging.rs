//! Tracing subscriber setup driven by the log configuration.

use anyhow::Result;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;

use vexadb_common::config::LogConfig;

/// Initialize the global subscriber; the returned guard must stay alive
/// for the append logger to keep flushing.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let level = match config.log_level {
        0 => Level::TRACE,
        1 => Level::DEBUG,
        2 => Level::INFO,
        3 => Level::WARN,
        _ => Level::ERROR,
    };

    match config.logger_type.as_str() {
        "AppendLogger" => {
            let appender =
                tracing_appender::rolling::never(&config.log_directory, &config.log_file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            fmt()
                .with_max_level(level)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        other => {
            if other == "SysLogger" {
                // no syslog integration; console output instead
                eprintln!("SysLogger is not supported, falling back to console");
            }
            fmt().with_max_level(level).init();
            Ok(None)
        }
    }
}
