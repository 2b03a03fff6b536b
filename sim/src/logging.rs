//! Tracing subscriber setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config;

/// Install a formatting subscriber filtered by `RUST_LOG`, or by the configured filter.
///
/// Safe to call more than once; only the first call installs anything. Returns whether
/// this call installed the subscriber.
pub fn init() -> bool {
    init_with_filter(&config::current().log_filter)
}

/// Like [`init`], with an explicit fallback filter.
pub fn init_with_filter(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
