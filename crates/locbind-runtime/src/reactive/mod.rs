#![forbid(unsafe_code)]

//! Change-tracking primitives used by the culture context.
//!
//! - [`Observable`]: a shared, versioned value with ordered change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`ChangeStream`]: a buffered, pull-style view of an observable.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per value-changing mutation.
//! 2. The new value is stored before any subscriber runs.
//! 3. Subscribers are notified in registration order.
//! 4. Setting a value equal to the current value is a no-op.

pub mod observable;
pub mod stream;

pub use observable::{Observable, Subscription};
pub use stream::ChangeStream;
