//! Tracing/logging initialization for the `NoteShare` binaries.
//!
//! `RUST_LOG` wins over the configured filter so operators can raise verbosity
//! for a single run without touching settings files.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Build the env-filter from `RUST_LOG` or the configured default directive
/// (e.g. `"noteshare_server=info"`).
pub fn build_filter(default_filter: &str) -> Result<EnvFilter> {
    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    EnvFilter::try_new(&directives).map_err(|e| Error::LogFilter(format!("{directives}: {e}")))
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- directive used when `RUST_LOG` is not set.
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) -> Result<()> {
    let env_filter = build_filter(default_filter)?;
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_directive() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter("noteshare_server=loudest").is_err());
    }

    #[test]
    fn accepts_crate_level_directive() {
        assert!(build_filter("noteshare_server=debug").is_ok());
    }
}
