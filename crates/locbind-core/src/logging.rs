#![forbid(unsafe_code)]

//! Logging helpers.
//!
//! With the `tracing` feature the `tracing` macros are re-exported so member
//! crates and applications share one entry point. The `tracing-json` feature
//! adds [`init_json`], a JSON subscriber filtered by `RUST_LOG`.

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "locbind_core=info,locbind_i18n=info,locbind_runtime=info";

/// Install a global JSON subscriber writing to stderr.
///
/// Returns `false` when a global subscriber was already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json() -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
