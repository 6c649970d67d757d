#![forbid(unsafe_code)]

//! Binding runtime: culture switching pushed into live targets.
//!
//! # Role in locbind
//! `locbind-runtime` ties the layers together. A [`CultureContext`] holds
//! the current culture and a [`BindingRegistry`]; bindings such as
//! [`LocBinding`] register themselves, attach to host targets through
//! [`ManagedBinding::provide_value`], and re-push their values whenever the
//! culture changes.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use locbind_core::Culture;
//! use locbind_i18n::{MemoryProvider, ResourceResolver, ResourceSet, ResourceTable, Value};
//! use locbind_runtime::{
//!     BindingTarget, CultureContext, LocBinding, ManagedBinding, PropertyKey, ProvideTarget,
//! };
//!
//! #[derive(Default)]
//! struct Label(RefCell<String>);
//!
//! impl BindingTarget for Label {
//!     fn apply(&self, _property: &PropertyKey, value: Value) {
//!         *self.0.borrow_mut() = value.as_text().unwrap_or_default().to_string();
//!     }
//! }
//!
//! let provider = MemoryProvider::new().with(
//!     ResourceSet::new("Strings")
//!         .with_culture(Culture::invariant(), ResourceTable::new().with("ok", "OK"))
//!         .with_culture(Culture::parse("fi").unwrap(), ResourceTable::new().with("ok", "Selvä")),
//! );
//! let resolver = Rc::new(ResourceResolver::new(Rc::new(provider)));
//! let ctx = CultureContext::new(Culture::parse("en").unwrap());
//!
//! let binding = LocBinding::builder(&ctx, &resolver).key("Strings:ok").register();
//! let label = Rc::new(Label::default());
//! let target: Rc<dyn BindingTarget> = label.clone();
//! binding
//!     .provide_value(ProvideTarget::Element { target, property: PropertyKey::text("Text") })
//!     .unwrap();
//!
//! ctx.set_culture(Culture::parse("fi-FI").unwrap());
//! assert_eq!(*label.0.borrow(), "Selvä");
//! # ctx.registry().clear();
//! ```

pub mod binding;
pub mod context;
pub mod loc_binding;
pub mod reactive;
pub mod registry;

pub use binding::{
    BindingError, BindingTarget, ManagedBinding, PropertyKey, ProvideTarget, Provided, TargetList,
};
pub use context::{
    CultureContext, CultureOverride, CultureStream, current_culture, install_global, reset_global,
    set_culture,
};
pub use loc_binding::{DefaultPolicy, LocBinding, LocBindingBuilder, ResourceKey};
pub use reactive::{ChangeStream, Observable, Subscription};
pub use registry::{BindingRegistry, BroadcastStats, RegistryConfig};
