//! Logging setup for the CLI and chapters
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` seeds the filter
//! (default `info`). `LOG_FORMAT` picks between the full formatter
//! (`pretty`, the default) and single-line `compact` output.

use tracing_subscriber::EnvFilter;

use crate::env::get_env_or;

pub fn init_logging() {
    let default_level = get_env_or("LOG_LEVEL", "info");
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // try_init so repeated calls (tests, chapter re-runs) are harmless.
    let result = match get_env_or("LOG_FORMAT", "pretty").as_str() {
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };
    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logging();
        init_logging();
    }
}
