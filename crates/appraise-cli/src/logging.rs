//! Log subscriber setup.
//!
//! Logs go to stderr so they never mix with command output. The filter comes
//! from `APPRAISE_LOG` (standard `EnvFilter` syntax); without it, `-v` flags
//! pick the level.

use anyhow::{anyhow, Result};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "APPRAISE_LOG";
pub const LOG_FORMAT_ENV: &str = "APPRAISE_LOG_FORMAT";

/// Install the global subscriber.
pub fn init(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let json = wants_json(std::env::var(LOG_FORMAT_ENV).ok().as_deref());
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {e}"))
}

#[must_use]
pub const fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn wants_json(format: Option<&str>) -> bool {
    format.is_some_and(|f| f.trim().eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_verbosity() {
        assert_eq!(level_from_verbosity(0), LevelFilter::WARN);
        assert_eq!(level_from_verbosity(1), LevelFilter::INFO);
        assert_eq!(level_from_verbosity(2), LevelFilter::DEBUG);
        assert_eq!(level_from_verbosity(9), LevelFilter::TRACE);
    }

    #[test]
    fn test_wants_json() {
        assert!(wants_json(Some("json")));
        assert!(wants_json(Some(" JSON ")));
        assert!(!wants_json(Some("text")));
        assert!(!wants_json(None));
    }
}
