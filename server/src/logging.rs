//! # Structured Logging
//!
//! Installs the `tracing` subscriber: `EnvFilter` for levels (`RUST_LOG`
//! wins over the configured level) and either a pretty or a JSON-lines
//! formatter.
//!
//! Logs go to stderr; stdout is left for command output such as `status`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for local development.
    Pretty,
    /// One JSON object per line, for log shipping.
    Json,
}

impl LogFormat {
    /// "json" (any case) is JSON; anything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Directive used when the configured level is a bare level name: our own
/// crates at that level, HTTP tracing one notch quieter.
pub fn default_directive(level: &str) -> String {
    if level.contains('=') || level.contains(',') {
        return level.to_string();
    }
    format!("xrpl_custody={level},xrpl_custody_server={level},tower_http=info")
}

/// Install the global subscriber. Call once, early in `main()`.
///
/// A second call leaves the first subscriber in place.
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));
    let stderr = std::io::stderr;

    let installed = match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(stderr).with_target(true))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(?format, "logging initialized");
    }
}
