//! Tracing initialization
//!
//! The service and the CLI tools share one log setup so their output lines
//! look alike: stderr only, `RUST_LOG` filtering, optional JSON.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines without ANSI colors
    Text,
    /// One JSON object per line (for log aggregation)
    Json,
}

impl LogFormat {
    /// Read the format from `LOG_FORMAT` (`json` or anything else for text)
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|v| Self::parse(&v))
            .unwrap_or(Self::Text)
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Initialize tracing with the format taken from `LOG_FORMAT`
///
/// `crate_name` logs at `info` by default; `tower_http` request traces are
/// enabled at the same level. `RUST_LOG` directives are applied on top.
pub fn init_tracing(crate_name: &str) -> anyhow::Result<()> {
    init_tracing_with(crate_name, LogFormat::from_env())
}

/// Initialize tracing with an explicit output format
pub fn init_tracing_with(crate_name: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("{}=info", crate_name).parse()?)
        .add_directive("tower_http=info".parse()?);

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?,
    }

    Ok(())
}
