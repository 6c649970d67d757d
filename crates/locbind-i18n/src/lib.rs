#![forbid(unsafe_code)]

//! Culture-aware resources for locbind.
//!
//! Provides named resource sets with per-culture tables and lineage
//! fallback, pluggable providers, a resolver whose cache never owns the
//! sets it hands out, and typed conversion of looked-up values into the
//! kind a destination property declares.

pub mod catalog;
pub mod provider;
pub mod resolver;
pub mod value;

pub use catalog::{CoverageReport, CultureCoverage, ResourceSet, ResourceTable};
pub use provider::{MemoryProvider, ResourceError, ResourceProvider};
pub use resolver::{MissingKey, ResolvedValue, ResourceResolver};
pub use value::{
    ConversionCultures, ConversionError, ImageBridge, StandardConverter, Value, ValueConverter,
    ValueKind,
};
