//! Resource providers: where resource sets come from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::catalog::ResourceSet;

/// Errors from resource set resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No resource set with this name exists.
    NotFound(String),
    /// The resource data could not be parsed.
    Parse(String),
    /// The provider failed for another reason (I/O, platform lookup).
    Provider { name: String, message: String },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "resource set not found: {name}"),
            Self::Parse(msg) => write!(f, "resource parse error: {msg}"),
            Self::Provider { name, message } => {
                write!(f, "resource provider failed for '{name}': {message}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// Loads resource sets by name.
///
/// Implementations may build a fresh set on every call; the
/// [`ResourceResolver`](crate::resolver::ResourceResolver) deduplicates
/// while a set is in use.
pub trait ResourceProvider {
    fn load(&self, name: &str) -> Result<Rc<ResourceSet>, ResourceError>;
}

impl<F> ResourceProvider for F
where
    F: Fn(&str) -> Result<Rc<ResourceSet>, ResourceError>,
{
    fn load(&self, name: &str) -> Result<Rc<ResourceSet>, ResourceError> {
        self(name)
    }
}

/// In-memory provider holding sets registered up front.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    sets: RefCell<HashMap<String, Rc<ResourceSet>>>,
    loads: std::cell::Cell<u64>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set under its own name, replacing any previous one.
    pub fn insert(&self, set: ResourceSet) {
        self.sets
            .borrow_mut()
            .insert(set.name().to_string(), Rc::new(set));
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(self, set: ResourceSet) -> Self {
        self.insert(set);
        self
    }

    /// Remove a set; subsequent loads report `NotFound`.
    pub fn remove(&self, name: &str) -> bool {
        self.sets.borrow_mut().remove(name).is_some()
    }

    /// Successful loads served so far.
    #[must_use]
    pub fn load_count(&self) -> u64 {
        self.loads.get()
    }
}

impl ResourceProvider for MemoryProvider {
    fn load(&self, name: &str) -> Result<Rc<ResourceSet>, ResourceError> {
        let set = self
            .sets
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(name.to_string()))?;
        self.loads.set(self.loads.get() + 1);
        Ok(set)
    }
}
