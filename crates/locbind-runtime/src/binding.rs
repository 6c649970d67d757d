#![forbid(unsafe_code)]

//! Managed bindings: culture-dependent values pushed into external targets.
//!
//! A [`ManagedBinding`] produces a value from the current culture and pushes
//! it into every target it has been attached to. Targets are owned by the
//! host (a widget tree, a document model) and are referenced weakly: a
//! target may disappear at any moment and the binding simply stops writing
//! to it.
//!
//! # Invariants
//!
//! 1. A binding never keeps a target alive (`Weak` only).
//! 2. A binding with zero targets reports alive. This covers the window in
//!    which a template has created the binding but no concrete element has
//!    attached yet. A binding that never receives a target therefore stays
//!    registered until the registry is cleared.
//! 3. [`update_targets`](ManagedBinding::update_targets) skips dead targets
//!    but never removes them; removal is the registry's job during cleanup.
//!
//! # Attachment
//!
//! ```text
//! provide_value(Element { target, property })  -> attach + Value
//! provide_value(TemplatePlaceholder)           -> Deferred (nothing attached)
//! provide_value(Detached { property })         -> Value (nothing attached)
//! ```

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use locbind_i18n::value::{Value, ValueKind};

/// A host object that accepts values for named properties.
///
/// Implementors own their interior mutability; bindings only hold `Weak`
/// references to them.
pub trait BindingTarget {
    fn apply(&self, property: &PropertyKey, value: Value);
}

/// Which property of a target a binding writes, and its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    name: Cow<'static, str>,
    kind: ValueKind,
}

impl PropertyKey {
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// A property accepting whatever the source produces.
    #[must_use]
    pub fn any(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ValueKind::Any)
    }

    /// A text property.
    #[must_use]
    pub fn text(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, ValueKind::Text)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.kind)
    }
}

/// Errors from value production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The binding was created without a lookup key.
    MissingKey,
    /// No resource set was named and no default is configured.
    MissingResourceSet { key: String },
    /// A custom binding source failed.
    Source(String),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKey => f.write_str("binding has no resource key"),
            Self::MissingResourceSet { key } => {
                write!(f, "no resource set for key '{key}' and no default configured")
            }
            Self::Source(msg) => write!(f, "binding source failed: {msg}"),
        }
    }
}

impl std::error::Error for BindingError {}

struct TargetRef {
    target: Weak<dyn BindingTarget>,
    property: PropertyKey,
}

impl TargetRef {
    fn is_alive(&self) -> bool {
        self.target.strong_count() > 0
    }
}

/// The targets one binding pushes into.
///
/// Shared state behind every [`ManagedBinding`]; entries are only ever
/// appended.
#[derive(Default)]
pub struct TargetList {
    entries: RefCell<Vec<TargetRef>>,
}

impl fmt::Debug for TargetList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetList")
            .field("len", &self.len())
            .field("live", &self.live_count())
            .finish()
    }
}

impl TargetList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-owning reference to `target`.
    pub fn attach(&self, target: &Rc<dyn BindingTarget>, property: PropertyKey) {
        self.entries.borrow_mut().push(TargetRef {
            target: Rc::downgrade(target),
            property,
        });
    }

    /// Zero targets, or at least one live target.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        let entries = self.entries.borrow();
        entries.is_empty() || entries.iter().any(TargetRef::is_alive)
    }

    /// Whether `target` is one of the live targets.
    #[must_use]
    pub fn contains(&self, target: &Rc<dyn BindingTarget>) -> bool {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.is_alive())
            .any(|e| std::ptr::addr_eq(e.target.as_ptr(), Rc::as_ptr(target)))
    }

    /// Attached targets, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries.borrow().iter().filter(|e| e.is_alive()).count()
    }

    /// Strong handles to the live targets with their properties.
    ///
    /// The list borrow is released before returning, so callers may write
    /// to targets that attach further targets in response.
    #[must_use]
    pub fn live(&self) -> Vec<(Rc<dyn BindingTarget>, PropertyKey)> {
        self.entries
            .borrow()
            .iter()
            .filter_map(|e| e.target.upgrade().map(|t| (t, e.property.clone())))
            .collect()
    }
}

/// What the host is attaching a binding to.
pub enum ProvideTarget {
    /// A concrete element property; the target is recorded.
    Element {
        target: Rc<dyn BindingTarget>,
        property: PropertyKey,
    },
    /// A template definition rather than an instance. Nothing is recorded
    /// and the host re-invokes the binding for each instantiation.
    TemplatePlaceholder,
    /// A one-off value request with no target to track.
    Detached { property: PropertyKey },
}

impl fmt::Debug for ProvideTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element { property, .. } => f
                .debug_struct("Element")
                .field("property", property)
                .finish_non_exhaustive(),
            Self::TemplatePlaceholder => f.write_str("TemplatePlaceholder"),
            Self::Detached { property } => f
                .debug_struct("Detached")
                .field("property", property)
                .finish(),
        }
    }
}

/// Result of [`ManagedBinding::provide_value`].
#[derive(Debug, Clone, PartialEq)]
pub enum Provided {
    /// The value to use right now.
    Value(Value),
    /// Template placeholder: keep the binding itself and ask again per instance.
    Deferred,
}

/// A registrable binding producing culture-dependent values.
///
/// Implementors supply [`targets`](Self::targets) and
/// [`produce_value`](Self::produce_value); liveness, attachment and target
/// updates are provided.
pub trait ManagedBinding {
    /// Target bookkeeping for this binding.
    fn targets(&self) -> &TargetList;

    /// Compute the value for `property` from the current culture.
    ///
    /// Must not mutate the registry or any target.
    fn produce_value(&self, property: &PropertyKey) -> Result<Value, BindingError>;

    fn is_alive(&self) -> bool {
        self.targets().is_alive()
    }

    fn is_target(&self, target: &Rc<dyn BindingTarget>) -> bool {
        self.targets().contains(target)
    }

    fn attach_target(&self, target: &Rc<dyn BindingTarget>, property: PropertyKey) {
        self.targets().attach(target, property);
    }

    /// Write a fresh value into every live target. Returns how many were written.
    fn update_targets(&self) -> Result<usize, BindingError> {
        let live = self.targets().live();
        for (target, property) in &live {
            let value = self.produce_value(property)?;
            target.apply(property, value);
        }
        Ok(live.len())
    }

    /// Handle one attachment request from the host.
    fn provide_value(&self, request: ProvideTarget) -> Result<Provided, BindingError> {
        match request {
            ProvideTarget::Element { target, property } => {
                self.attach_target(&target, property.clone());
                self.produce_value(&property).map(Provided::Value)
            }
            ProvideTarget::TemplatePlaceholder => Ok(Provided::Deferred),
            ProvideTarget::Detached { property } => {
                self.produce_value(&property).map(Provided::Value)
            }
        }
    }
}
