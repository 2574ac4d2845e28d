//! Subscriber initialization, called exactly once from `skipledger-cli`'s
//! `main`. Every other crate only emits through `tracing::{debug,info,warn,
//! error}` and `#[tracing::instrument]`; none of them configure a
//! subscriber themselves.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output shape for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format {other:?}, expected compact or json")),
        }
    }
}

/// Install a global subscriber driven by `RUST_LOG` (falling back to
/// `info` for every target), formatting lines per `format`.
///
/// # Panics
/// Panics if a global subscriber is already installed — this should be
/// called exactly once, at process start.
pub fn init(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Compact => {
            tracing_subscriber::registry().with(env_filter).with(fmt::layer().compact()).init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry().with(env_filter).with(fmt::layer().json()).init();
        }
    }
}
