//! Tracing subscriber setup

use crate::config::LoggingConfig;
use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Filter directive for the configured level; `verbose` forces debug
#[must_use]
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("astroatmos={level},warn")
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the config unless `verbose`.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) if !verbose => filter,
        _ => EnvFilter::try_new(filter_directive(config, verbose))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: "pretty".to_string(),
        }
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(&logging("warn"), false), "astroatmos=warn,warn");
        assert_eq!(filter_directive(&logging("warn"), true), "astroatmos=debug,warn");
    }

    #[test]
    fn test_directive_parses() {
        assert!(EnvFilter::try_new(filter_directive(&logging("trace"), false)).is_ok());
    }
}
