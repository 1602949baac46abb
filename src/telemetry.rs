//! Logging setup
//!
//! Logs go to stderr; stdout is reserved for results. `RUST_LOG` wins over
//! the configured level.

use crate::config::LoggingConfig;
use std::io;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "poly=warn";
const DEBUG_DIRECTIVE: &str = "poly=debug";

/// Filter directive implied by the configuration, ignoring `RUST_LOG`
pub fn directive(logging: &LoggingConfig) -> &str {
    match (&logging.level, logging.debug) {
        (Some(level), _) => level.as_str(),
        (None, true) => DEBUG_DIRECTIVE,
        (None, false) => DEFAULT_DIRECTIVE,
    }
}

/// Install the global subscriber
pub fn init(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(logging)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_precedence() {
        let mut logging = LoggingConfig::default();
        assert_eq!(directive(&logging), "poly=warn");

        logging.debug = true;
        assert_eq!(directive(&logging), "poly=debug");

        logging.level = Some("poly=trace".to_string());
        assert_eq!(directive(&logging), "poly=trace");
    }
}
