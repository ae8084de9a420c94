//! Logging for TurboCommerce storefront binaries.
//!
//! Library crates only emit `tracing` events. Binaries call [`init`] once at
//! startup to install a subscriber that writes to stderr.

mod logging;

pub use logging::{init, LogFormat, LogLevel, LogSettings, ObservabilityError, LOG_ENV};
