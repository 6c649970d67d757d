#![forbid(unsafe_code)]

//! Core: culture identifiers, system culture detection, and configuration.
//!
//! # Role in locbind
//! `locbind-core` is the bottom layer. It owns the [`Culture`] value type
//! used by the resource layer (`locbind-i18n`) and the binding runtime
//! (`locbind-runtime`), plus the environment-driven [`LocbindConfig`].

pub mod config;
pub mod culture;
pub mod logging;

pub use config::{ConfigError, ConfigParse, DEFAULT_CLEANUP_THRESHOLD, LocbindConfig};
pub use culture::{Culture, CultureError, detect_system_culture};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
