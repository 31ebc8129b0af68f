/// Logging setup for binaries and tests embedding the SDK.
///
/// The SDK itself only emits `tracing` events; nothing is printed unless the
/// application installs a subscriber.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Panics if a global subscriber is already set; use [`try_init_logging`]
/// when that can happen.
pub fn init_logging() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Like [`init_logging`] but returns `false` instead of panicking when a
/// subscriber is already installed.
pub fn try_init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        try_init_logging();
        assert!(!try_init_logging());
    }
}
