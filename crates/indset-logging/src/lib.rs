//! Tracing subscriber setup.
//!
//! The library crates only emit `tracing` events; whoever owns `main` (or a
//! test binary) installs a subscriber once. `RUST_LOG` overrides the default
//! filter.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "indset_core=info,indset_dist=info";

/// Filter used by [`init_for_tests`] when `RUST_LOG` is unset.
pub const TEST_FILTER: &str = "indset_core=debug,indset_dist=debug";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

/// Install the global subscriber.
///
/// # Panics
///
/// Panics if a global subscriber is already set; use [`try_init`] where that
/// can happen.
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(fmt::layer())
        .init();
}

/// Install the global subscriber unless one is already set.
pub fn try_init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(fmt::layer())
        .try_init()
}

/// Subscriber for test binaries: output goes through the test harness
/// capture, and repeated calls are harmless.
pub fn init_for_tests() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(TEST_FILTER))
        .with(fmt::layer().with_test_writer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_refused() {
        init_for_tests();
        assert!(try_init().is_err());
        init_for_tests();
    }

    #[test]
    fn test_default_filters_parse() {
        for directives in [DEFAULT_FILTER, TEST_FILTER] {
            assert!(EnvFilter::try_new(directives).is_ok());
        }
    }
}
