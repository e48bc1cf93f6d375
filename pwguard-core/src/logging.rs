//! Log filtering and subscriber setup for the `pwguard` binary.
//!
//! Verbosity flags pick a default filter. `PWGUARD_LOG` replaces it with any
//! `EnvFilter` directive string, except under `--quiet`, which always means
//! errors only. `PWGUARD_LOG_FORMAT=json` switches stderr output to JSON
//! lines.
//!
//! Environment variables:
//! - `PWGUARD_LOG`: filter directives, e.g. `pwguard_core=trace,sqlx=warn`
//! - `PWGUARD_LOG_FORMAT`: `text` (default) or `json`

use crate::{Result, error::ValidatorError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "PWGUARD_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "PWGUARD_LOG_FORMAT";

/// Shape of log lines on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to text.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Default directives for the given flags.
///
/// Our own crates follow the verbosity; dependencies such as sqlx stay at
/// `warn` until `-vv`.
pub fn default_directives(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn,pwguard=info,pwguard_core=info",
        (false, 1) => "warn,pwguard=debug,pwguard_core=debug",
        (false, _) => "info,pwguard=trace,pwguard_core=trace",
    }
}

/// Builds the filter from flags and an optional directive override.
///
/// # Errors
/// Returns a configuration error if `env_directives` does not parse.
pub fn filter_for(verbose: u8, quiet: bool, env_directives: Option<&str>) -> Result<EnvFilter> {
    let directives = match env_directives.map(str::trim) {
        Some(custom) if !quiet && !custom.is_empty() => custom,
        _ => default_directives(verbose, quiet),
    };

    EnvFilter::try_new(directives).map_err(|e| {
        ValidatorError::configuration(format!(
            "Invalid {} directives '{}': {}",
            LOG_ENV, directives, e
        ))
    })
}

/// Installs the global subscriber, writing to stderr.
///
/// # Errors
/// Returns a configuration error if `PWGUARD_LOG` is malformed or a
/// subscriber is already installed.
///
/// # Example
/// ```rust,no_run
/// use pwguard_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let env_directives = std::env::var(LOG_ENV).ok();
    let filter = filter_for(verbose, quiet, env_directives.as_deref())?;
    let format = std::env::var(LOG_FORMAT_ENV)
        .map(|name| LogFormat::from_name(&name))
        .unwrap_or_default();

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(verbose > 1),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    installed.map_err(|e| {
        ValidatorError::configuration(format!("Failed to initialize logging: {}", e))
    })
}
