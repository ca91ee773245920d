//! Subscriber setup for binaries and examples that do not install their own.

use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`
/// (defaults to `dog_pool=info`). Returns false if one was already set.
pub fn init_tracing() -> bool {
    fmt().with_env_filter(default_filter()).try_init().is_ok()
}

/// Same as [`init_tracing`] with JSON formatted records
pub fn init_json_tracing() -> bool {
    fmt().json().with_env_filter(default_filter()).try_init().is_ok()
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dog_pool=info"))
}
