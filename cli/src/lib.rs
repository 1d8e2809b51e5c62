pub mod input;
pub mod report;

use waterline_core::config::LoggingConfig;

/// Install the global subscriber at the configured level
pub fn init_logging(config: &LoggingConfig) {
    let log_level = match config.level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_target(config.include_modules)
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
