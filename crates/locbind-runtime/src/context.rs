#![forbid(unsafe_code)]

//! Culture context: the current UI culture and its change propagation.
//!
//! [`CultureContext`] owns the current culture, a secondary *formatting*
//! culture, and the [`BindingRegistry`] whose bindings depend on them. An
//! effective culture change runs, in this order:
//!
//! ```text
//! set_culture(new)
//!   1. store new value                  (readers now observe `new`)
//!   2. formatting culture = new         (only if sync is enabled)
//!   3. registry.broadcast_update()      (bindings re-push into targets)
//!   4. subscribers / streams notified   (registration order)
//! ```
//!
//! Setting the culture it already has is a no-op: nothing is broadcast and
//! nobody is notified.
//!
//! A `set_culture` issued while a change is still propagating (from a
//! subscriber, a stream consumer, or a binding target) is queued and runs
//! once the current change has reached every subscriber. Observers therefore
//! see changes one at a time, in request order, and the last event always
//! matches [`CultureContext::current_culture`].
//!
//! # Process scope
//!
//! A thread-local global context is available through
//! [`CultureContext::global`]; it is created from the environment on first
//! use. [`install_global`] and [`reset_global`] give it an explicit
//! lifecycle. Components should prefer receiving a context handle
//! explicitly.
//!
//! Bindings hold the context that created them and the context's registry
//! holds the bindings, so a context with registered bindings stays alive
//! until [`BindingRegistry::clear`] (or [`reset_global`]) runs.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use locbind_core::{Culture, LocbindConfig};
use tracing::{debug, info};

use crate::binding::ManagedBinding;
use crate::reactive::{ChangeStream, Observable, Subscription};
use crate::registry::{BindingRegistry, RegistryConfig};

thread_local! {
    static GLOBAL_CONTEXT: RefCell<Option<CultureContext>> = const { RefCell::new(None) };
}

/// Buffered stream of effective culture changes.
pub type CultureStream = ChangeStream<Culture>;

struct Shared {
    current: Observable<Culture>,
    formatting: Observable<Culture>,
    sync_formatting: Rc<Cell<bool>>,
    registry: BindingRegistry,
    overrides: Rc<RefCell<Vec<Culture>>>,
    propagating: Cell<bool>,
    queued: RefCell<VecDeque<Culture>>,
    // Runs steps 2 and 3; registered before any external subscriber.
    _propagation: Subscription,
}

/// Handle to a culture context. Clones share state.
#[derive(Clone)]
pub struct CultureContext {
    shared: Rc<Shared>,
}

impl fmt::Debug for CultureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CultureContext")
            .field("current", &self.shared.current.get())
            .field("formatting", &self.shared.formatting.get())
            .field("sync_formatting", &self.shared.sync_formatting.get())
            .field("overrides", &self.shared.overrides.borrow().len())
            .field("registry", &self.shared.registry)
            .finish()
    }
}

impl CultureContext {
    /// Context starting at `culture` with default configuration.
    #[must_use]
    pub fn new(culture: Culture) -> Self {
        Self::with_config(&LocbindConfig::default().with_culture(culture))
    }

    /// Context built from `config`; the initial culture is detected from the
    /// environment when the config does not name one.
    #[must_use]
    pub fn with_config(config: &LocbindConfig) -> Self {
        let culture = config.resolve_initial_culture();
        let current = Observable::new(culture.clone());
        let formatting = Observable::new(culture);
        let sync_formatting = Rc::new(Cell::new(config.sync_formatting_culture));
        let registry = BindingRegistry::new(RegistryConfig::new(config.cleanup_threshold));

        let propagation = {
            let formatting = formatting.clone();
            let sync = Rc::clone(&sync_formatting);
            let registry = registry.clone();
            current.subscribe(move |culture: &Culture| {
                if sync.get() {
                    formatting.set(culture.clone());
                }
                let stats = registry.broadcast_update();
                debug!(
                    culture = %culture,
                    bindings = stats.bindings,
                    targets = stats.targets_updated,
                    "culture broadcast"
                );
            })
        };

        Self {
            shared: Rc::new(Shared {
                current,
                formatting,
                sync_formatting,
                registry,
                overrides: Rc::new(RefCell::new(Vec::new())),
                propagating: Cell::new(false),
                queued: RefCell::new(VecDeque::new()),
                _propagation: propagation,
            }),
        }
    }

    /// Context configured from `LOCBIND_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_config(&LocbindConfig::from_env())
    }

    /// The thread's global context, created from the environment on first use.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_CONTEXT.with(|slot| {
            slot.borrow_mut()
                .get_or_insert_with(Self::from_env)
                .clone()
        })
    }

    /// Active culture: the innermost scoped override, else the base culture.
    #[must_use]
    pub fn current_culture(&self) -> Culture {
        if let Some(culture) = self.shared.overrides.borrow().last() {
            return culture.clone();
        }
        self.shared.current.get()
    }

    /// Base culture, ignoring overrides.
    #[must_use]
    pub fn base_culture(&self) -> Culture {
        self.shared.current.get()
    }

    /// Change the culture. Returns `false` (and does nothing) if `culture`
    /// is already current.
    ///
    /// Called during propagation, the change is queued behind the one in
    /// flight and compared against the last queued culture instead.
    pub fn set_culture(&self, culture: Culture) -> bool {
        let shared = &self.shared;
        if shared.propagating.get() {
            let mut queued = shared.queued.borrow_mut();
            let latest = queued.back().cloned().unwrap_or_else(|| shared.current.get());
            if latest == culture {
                return false;
            }
            debug!(to = %culture, "culture change queued during propagation");
            queued.push_back(culture);
            return true;
        }

        if shared.current.get() == culture {
            return false;
        }
        let _guard = PropagationGuard::enter(shared);
        let mut next = Some(culture);
        while let Some(culture) = next {
            let previous = shared.current.get();
            if previous != culture {
                info!(from = %previous, to = %culture, "culture change");
                shared.current.set(culture);
            }
            next = shared.queued.borrow_mut().pop_front();
        }
        true
    }

    /// Secondary culture used for number and date formatting.
    #[must_use]
    pub fn formatting_culture(&self) -> Culture {
        self.shared.formatting.get()
    }

    /// Set the formatting culture alone. Bindings are not refreshed.
    pub fn set_formatting_culture(&self, culture: Culture) -> bool {
        self.shared.formatting.set(culture)
    }

    #[must_use]
    pub fn sync_formatting_culture(&self) -> bool {
        self.shared.sync_formatting.get()
    }

    /// Whether culture changes are mirrored into the formatting culture.
    pub fn set_sync_formatting_culture(&self, enabled: bool) {
        self.shared.sync_formatting.set(enabled);
    }

    /// Subscribe to effective culture changes.
    pub fn subscribe(&self, callback: impl Fn(&Culture) + 'static) -> Subscription {
        self.shared.current.subscribe(callback)
    }

    /// Open a buffered stream of effective culture changes.
    #[must_use]
    pub fn stream(&self) -> CultureStream {
        ChangeStream::open(&self.shared.current)
    }

    /// Incremented once per effective culture change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.current.version()
    }

    /// Registry refreshed on every culture change.
    #[must_use]
    pub fn registry(&self) -> &BindingRegistry {
        &self.shared.registry
    }

    /// Register a binding with this context's registry.
    pub fn register(&self, binding: Rc<dyn ManagedBinding>) {
        self.shared.registry.register(binding);
    }

    /// Temporarily resolve values in `culture` without broadcasting.
    ///
    /// Dropping the guard restores the previous culture.
    #[must_use = "dropping this guard clears the culture override"]
    pub fn push_override(&self, culture: Culture) -> CultureOverride {
        self.shared.overrides.borrow_mut().push(culture.clone());
        CultureOverride {
            stack: Rc::clone(&self.shared.overrides),
            culture,
        }
    }

    /// Whether two handles refer to the same context.
    #[must_use]
    pub fn same_context(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

/// Marks a context as propagating; clears the flag and any leftover queue
/// on drop, so a panicking subscriber does not wedge the context.
struct PropagationGuard<'a> {
    shared: &'a Shared,
}

impl<'a> PropagationGuard<'a> {
    fn enter(shared: &'a Shared) -> Self {
        shared.propagating.set(true);
        Self { shared }
    }
}

impl Drop for PropagationGuard<'_> {
    fn drop(&mut self) {
        self.shared.propagating.set(false);
        self.shared.queued.borrow_mut().clear();
    }
}

/// RAII guard for a scoped culture override.
#[must_use = "dropping this guard clears the culture override"]
pub struct CultureOverride {
    stack: Rc<RefCell<Vec<Culture>>>,
    culture: Culture,
}

impl fmt::Debug for CultureOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CultureOverride")
            .field("culture", &self.culture)
            .finish()
    }
}

impl Drop for CultureOverride {
    fn drop(&mut self) {
        let popped = self.stack.borrow_mut().pop();
        if let Some(popped) = popped {
            debug_assert_eq!(popped, self.culture);
        }
    }
}

/// Make `context` the thread's global context, returning the previous one.
pub fn install_global(context: CultureContext) -> Option<CultureContext> {
    GLOBAL_CONTEXT.with(|slot| slot.borrow_mut().replace(context))
}

/// Tear down the thread's global context.
///
/// Its registry is cleared so bindings and their context are released; the
/// next [`CultureContext::global`] call starts from the environment again.
pub fn reset_global() {
    let previous = GLOBAL_CONTEXT.with(|slot| slot.borrow_mut().take());
    if let Some(context) = previous {
        context.registry().clear();
    }
}

/// Convenience: set the global culture.
pub fn set_culture(culture: Culture) -> bool {
    CultureContext::global().set_culture(culture)
}

/// Convenience: the global culture.
#[must_use]
pub fn current_culture() -> Culture {
    CultureContext::global().current_culture()
}
