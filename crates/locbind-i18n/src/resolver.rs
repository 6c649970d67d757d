//! Resource set resolution with a non-owning cache.
//!
//! # Design
//!
//! [`ResourceResolver`] sits between bindings and a [`ResourceProvider`].
//! Resolved sets are cached by name as `Weak<ResourceSet>`, so the cache
//! itself never keeps a set alive: a set lives exactly as long as some
//! binding (or other caller) holds the `Rc` returned by [`resolve`].
//! A dead cache entry is treated as a miss and re-loaded.
//!
//! Provider failures never escape [`lookup`]: they are logged and the
//! lookup reports "not found", so callers fall through to their default
//! value policy.
//!
//! Not thread-safe: the cache mutates on read (`RefCell`).
//!
//! [`resolve`]: ResourceResolver::resolve
//! [`lookup`]: ResourceResolver::lookup

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use locbind_core::Culture;

use crate::catalog::ResourceSet;
use crate::provider::{ResourceError, ResourceProvider};
use crate::value::Value;

/// A key that no resource set on the chain could resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingKey {
    pub resource_set: String,
    pub key: String,
    pub culture: Culture,
}

/// A value found by [`ResourceResolver::lookup_entry`].
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    pub value: Value,
    /// Culture of the table that supplied `value`.
    pub source: Culture,
    /// The set the value came from. Holding it keeps the set cached.
    pub set: Rc<ResourceSet>,
}

type MissingKeyHandler = Rc<dyn Fn(&MissingKey) -> Option<Value>>;

/// Resolves resource sets by name and values by `(set, key, culture)`.
pub struct ResourceResolver {
    provider: Rc<dyn ResourceProvider>,
    cache: RefCell<HashMap<String, Weak<ResourceSet>>>,
    default_resource_set: RefCell<Option<String>>,
    missing_key_handler: RefCell<Option<MissingKeyHandler>>,
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("cached", &self.cache.borrow().len())
            .field("default_resource_set", &self.default_resource_set.borrow())
            .field(
                "missing_key_handler",
                &self.missing_key_handler.borrow().is_some(),
            )
            .finish_non_exhaustive()
    }
}

impl ResourceResolver {
    /// Create a resolver over `provider` with an empty cache.
    #[must_use]
    pub fn new(provider: Rc<dyn ResourceProvider>) -> Self {
        Self {
            provider,
            cache: RefCell::new(HashMap::new()),
            default_resource_set: RefCell::new(None),
            missing_key_handler: RefCell::new(None),
        }
    }

    /// Builder: resource set used by bindings that do not name one.
    #[must_use]
    pub fn with_default_resource_set(self, name: impl Into<String>) -> Self {
        self.set_default_resource_set(Some(name.into()));
        self
    }

    pub fn set_default_resource_set(&self, name: Option<String>) {
        *self.default_resource_set.borrow_mut() = name;
    }

    #[must_use]
    pub fn default_resource_set(&self) -> Option<String> {
        self.default_resource_set.borrow().clone()
    }

    /// Install a hook consulted when a key cannot be resolved.
    ///
    /// Returning `Some` supplies the value; `None` lets the caller's default
    /// policy apply.
    pub fn set_missing_key_handler(
        &self,
        handler: impl Fn(&MissingKey) -> Option<Value> + 'static,
    ) {
        *self.missing_key_handler.borrow_mut() = Some(Rc::new(handler));
    }

    pub fn clear_missing_key_handler(&self) {
        *self.missing_key_handler.borrow_mut() = None;
    }

    /// Resolve a set by name, loading it on a cache miss.
    pub fn resolve(&self, name: &str) -> Result<Rc<ResourceSet>, ResourceError> {
        if let Some(set) = self.cache.borrow().get(name).and_then(Weak::upgrade) {
            return Ok(set);
        }

        #[cfg(feature = "tracing")]
        debug!(resource_set = name, "resource cache miss");

        let set = self.provider.load(name)?;
        let mut cache = self.cache.borrow_mut();
        cache.retain(|_, weak| weak.strong_count() > 0);
        cache.insert(name.to_string(), Rc::downgrade(&set));
        Ok(set)
    }

    /// Look up `key` in the named set for `culture`.
    ///
    /// Provider failures are swallowed and reported as `None`.
    #[must_use]
    pub fn lookup(&self, name: &str, key: &str, culture: &Culture) -> Option<Value> {
        self.lookup_entry(name, key, culture).map(|entry| entry.value)
    }

    /// Like [`lookup`](Self::lookup), also returning the supplying culture
    /// and the resolved set.
    #[must_use]
    pub fn lookup_entry(&self, name: &str, key: &str, culture: &Culture) -> Option<ResolvedValue> {
        let set = match self.resolve(name) {
            Ok(set) => set,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                warn!(resource_set = name, key, error = %_err, "resource set unavailable");
                return None;
            }
        };
        let (source, value) = set.lookup_entry(key, culture)?;
        let (source, value) = (source.clone(), value.clone());
        Some(ResolvedValue { value, source, set })
    }

    /// Consult the missing-key handler, if one is installed.
    #[must_use]
    pub fn resolve_missing(&self, name: &str, key: &str, culture: &Culture) -> Option<Value> {
        // Clone out so the handler may reinstall itself.
        let handler = self.missing_key_handler.borrow().clone()?;
        handler(&MissingKey {
            resource_set: name.to_string(),
            key: key.to_string(),
            culture: culture.clone(),
        })
    }

    /// Cache entries whose set is still alive.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.cache
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ResourceTable;
    use crate::provider::MemoryProvider;

    fn c(tag: &str) -> Culture {
        Culture::parse(tag).unwrap()
    }

    fn provider() -> Rc<MemoryProvider> {
        Rc::new(
            MemoryProvider::new().with(
                ResourceSet::new("Strings")
                    .with_culture(Culture::invariant(), ResourceTable::new().with("hi", "Hello"))
                    .with_culture(c("es"), ResourceTable::new().with("hi", "Hola")),
            ),
        )
    }

    #[test]
    fn lookup_uses_culture() {
        let resolver = ResourceResolver::new(provider());
        assert_eq!(resolver.lookup("Strings", "hi", &c("es-MX")), Some("Hola".into()));
        assert_eq!(resolver.lookup("Strings", "hi", &c("en")), Some("Hello".into()));
        assert_eq!(resolver.lookup("Strings", "bye", &c("en")), None);
    }

    #[test]
    fn entry_carries_source_culture_and_set() {
        let resolver = ResourceResolver::new(provider());
        let entry = resolver.lookup_entry("Strings", "hi", &c("es-MX")).unwrap();
        assert_eq!(entry.value, Value::from("Hola"));
        assert_eq!(entry.source, c("es"));
        assert_eq!(entry.set.name(), "Strings");

        let entry = resolver.lookup_entry("Strings", "hi", &c("fr")).unwrap();
        assert!(entry.source.is_invariant());
        assert!(resolver.lookup_entry("Nope", "hi", &c("fr")).is_none());
    }

    #[test]
    fn unknown_set_is_swallowed() {
        let resolver = ResourceResolver::new(provider());
        assert_eq!(resolver.lookup("Nope", "hi", &c("en")), None);
        assert!(matches!(
            resolver.resolve("Nope"),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn cache_does_not_own_sets() {
        // A provider that builds a fresh set per load, so only the cache
        // and the caller could keep it alive.
        let loads = Rc::new(std::cell::Cell::new(0u32));
        let loads_clone = Rc::clone(&loads);
        let fresh = move |name: &str| -> Result<Rc<ResourceSet>, ResourceError> {
            loads_clone.set(loads_clone.get() + 1);
            Ok(Rc::new(ResourceSet::new(name)))
        };
        let resolver = ResourceResolver::new(Rc::new(fresh));

        let held = resolver.resolve("A").unwrap();
        let again = resolver.resolve("A").unwrap();
        assert!(Rc::ptr_eq(&held, &again));
        assert_eq!(loads.get(), 1);
        assert_eq!(resolver.cached_count(), 1);

        drop(held);
        drop(again);
        assert_eq!(resolver.cached_count(), 0);

        let _reloaded = resolver.resolve("A").unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn dead_entries_pruned_on_insert() {
        let fresh = |name: &str| -> Result<Rc<ResourceSet>, ResourceError> {
            Ok(Rc::new(ResourceSet::new(name)))
        };
        let resolver = ResourceResolver::new(Rc::new(fresh));
        drop(resolver.resolve("A").unwrap());
        let _b = resolver.resolve("B").unwrap();
        assert_eq!(resolver.cache.borrow().len(), 1);
    }

    #[test]
    fn missing_key_handler_supplies_values() {
        let resolver = ResourceResolver::new(provider());
        assert_eq!(resolver.resolve_missing("Strings", "x", &c("en")), None);

        resolver.set_missing_key_handler(|missing| {
            (missing.key == "x")
                .then(|| Value::from(format!("?{}@{}", missing.key, missing.culture)))
        });
        assert_eq!(
            resolver.resolve_missing("Strings", "x", &c("fr")),
            Some("?x@fr".into())
        );
        assert_eq!(resolver.resolve_missing("Strings", "y", &c("fr")), None);

        resolver.clear_missing_key_handler();
        assert_eq!(resolver.resolve_missing("Strings", "x", &c("fr")), None);
    }

    #[test]
    fn default_resource_set_round_trips() {
        let resolver = ResourceResolver::new(provider()).with_default_resource_set("Strings");
        assert_eq!(resolver.default_resource_set().as_deref(), Some("Strings"));
        resolver.set_default_resource_set(None);
        assert_eq!(resolver.default_resource_set(), None);
    }
}
