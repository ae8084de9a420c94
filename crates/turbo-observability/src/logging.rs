//! Subscriber initialisation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Environment variable holding filter directives. Overrides [`LogSettings::level`].
pub const LOG_ENV: &str = "SHOP_LOG";

const STOREFRONT_TARGETS: &[&str] = &[
    "turbo_commerce",
    "turbo_cache",
    "turbo_auth",
    "turbo_data",
    "turbo_storefront",
    "shop",
];

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to initialise tracing subscriber: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Minimum level for the storefront crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Level for a `-v` count on top of `self`.
    pub fn raised_by(self, verbosity: u8) -> Self {
        let all = [Self::Error, Self::Warn, Self::Info, Self::Debug, Self::Trace];
        let start = all.iter().position(|l| *l == self).unwrap_or(1);
        all[(start + verbosity as usize).min(all.len() - 1)]
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ObservabilityError::Filter(format!("unknown level `{other}`"))),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, for terminals.
    #[default]
    Human,
    /// One JSON object per line, for log aggregation.
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LogSettings {
    pub fn new(level: LogLevel, format: LogFormat) -> Self {
        Self { level, format }
    }

    /// Directives used when [`LOG_ENV`] is unset.
    pub fn directives(&self) -> String {
        let mut directives = vec!["warn".to_string()];
        directives.extend(
            STOREFRONT_TARGETS
                .iter()
                .map(|target| format!("{target}={}", self.level)),
        );
        directives.join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter, ObservabilityError> {
        match std::env::var(LOG_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
                .map_err(|e| ObservabilityError::Filter(e.to_string())),
            _ => EnvFilter::try_new(self.directives())
                .map_err(|e| ObservabilityError::Filter(e.to_string())),
        }
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(settings: &LogSettings) -> Result<(), ObservabilityError> {
    let filter = settings.env_filter()?;
    match settings.format {
        LogFormat::Human => init_with_layer(
            filter,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(std::io::stderr),
        ),
        LogFormat::Json => init_with_layer(
            filter,
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .with_writer(std::io::stderr),
        ),
    }
}

fn init_with_layer<L>(filter: EnvFilter, fmt_layer: L) -> Result<(), ObservabilityError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_verbosity_raises_level() {
        assert_eq!(LogLevel::Warn.raised_by(0), LogLevel::Warn);
        assert_eq!(LogLevel::Warn.raised_by(1), LogLevel::Info);
        assert_eq!(LogLevel::Warn.raised_by(9), LogLevel::Trace);
    }

    #[test]
    fn test_directives_parse() {
        let settings = LogSettings::new(LogLevel::Debug, LogFormat::Json);
        let directives = settings.directives();
        assert!(directives.contains("turbo_commerce=debug"));
        assert!(EnvFilter::try_new(directives).is_ok());
    }
}
