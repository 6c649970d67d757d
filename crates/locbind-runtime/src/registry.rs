#![forbid(unsafe_code)]

//! Registry of active bindings with amortized cleanup.
//!
//! # Design
//!
//! [`BindingRegistry`] owns every registered [`ManagedBinding`] (never their
//! targets). Bindings whose targets have all been dropped are not removed
//! eagerly; instead every `cleanup_threshold`-th registration triggers a
//! linear [`cleanup`](BindingRegistry::cleanup) pass, which spreads the cost
//! of detecting dead bindings across insertions.
//!
//! ```text
//! register x40   [b1 b2 b3 b4 b5† b6 ... b40]      counter = 40
//! register b41   counter = 41 > 40 -> cleanup, counter = 0
//!                [b1 b2 b3 b4 b6 ... b40 b41]      († purged, order kept)
//! ```
//!
//! # Invariants
//!
//! 1. Every entry was added by `register` and has not yet been found dead
//!    by a cleanup pass.
//! 2. Cleanup never reorders survivors and never removes a binding whose
//!    `is_alive()` is true. Liveness is checked without holding the
//!    registry borrow, and bindings registered meanwhile are kept.
//! 3. `broadcast_update` iterates a snapshot; bindings registered during a
//!    broadcast are not updated by that broadcast, and cleanup during a
//!    broadcast does not disturb it.
//!
//! # Threading
//!
//! Single-threaded by construction (`Rc` + `RefCell`): the registry is
//! `!Send` and `!Sync`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use locbind_core::DEFAULT_CLEANUP_THRESHOLD;
use tracing::{debug, trace, warn};

use crate::binding::{BindingTarget, ManagedBinding};

/// Registry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Registrations after which a cleanup pass runs.
    pub cleanup_threshold: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }
}

impl RegistryConfig {
    /// Threshold of at least 1.
    #[must_use]
    pub fn new(cleanup_threshold: usize) -> Self {
        Self {
            cleanup_threshold: cleanup_threshold.max(1),
        }
    }
}

/// Totals reported by [`BindingRegistry::broadcast_update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Bindings in the snapshot.
    pub bindings: usize,
    /// Target writes performed.
    pub targets_updated: usize,
    /// Bindings whose value production failed.
    pub failures: usize,
}

struct RegistryInner {
    config: RegistryConfig,
    active: Vec<Rc<dyn ManagedBinding>>,
    inserts_since_cleanup: usize,
}

/// Shared handle to the active-binding list.
///
/// Clones refer to the same registry.
#[derive(Clone)]
pub struct BindingRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("BindingRegistry")
            .field("config", &inner.config)
            .field("active", &inner.active.len())
            .field("inserts_since_cleanup", &inner.inserts_since_cleanup)
            .finish()
    }
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl BindingRegistry {
    #[must_use]
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryInner {
                config: RegistryConfig::new(config.cleanup_threshold),
                active: Vec::new(),
                inserts_since_cleanup: 0,
            })),
        }
    }

    #[must_use]
    pub fn config(&self) -> RegistryConfig {
        self.inner.borrow().config
    }

    /// Append `binding`; every time the insertion counter exceeds the
    /// threshold a cleanup pass runs and the counter resets.
    pub fn register(&self, binding: Rc<dyn ManagedBinding>) {
        let due = {
            let mut inner = self.inner.borrow_mut();
            inner.active.push(binding);
            inner.inserts_since_cleanup += 1;
            inner.inserts_since_cleanup > inner.config.cleanup_threshold
        };
        if due {
            self.cleanup();
        }
    }

    /// Drop every binding whose `is_alive()` is false, keeping order.
    ///
    /// Returns the number of bindings purged.
    pub fn cleanup(&self) -> usize {
        // Liveness is evaluated on a snapshot: `is_alive` may be overridden
        // and is free to read (or register into) this registry.
        let dead: Vec<Rc<dyn ManagedBinding>> = self
            .bindings()
            .into_iter()
            .filter(|binding| !binding.is_alive())
            .collect();
        let remaining = {
            let mut inner = self.inner.borrow_mut();
            inner.inserts_since_cleanup = 0;
            if !dead.is_empty() {
                let doomed: HashSet<*const ()> = dead.iter().map(binding_addr).collect();
                inner
                    .active
                    .retain(|binding| !doomed.contains(&binding_addr(binding)));
            }
            inner.active.len()
        };
        let purged = dead.len();
        // Last strong handles to dead bindings go away outside the borrow.
        drop(dead);
        debug!(purged, remaining, "binding registry cleanup");
        purged
    }

    /// Ask every registered binding to refresh its targets.
    ///
    /// Iterates a snapshot, so bindings may register new bindings or trigger
    /// cleanup while being updated. A binding that fails to produce a value
    /// is logged and skipped.
    pub fn broadcast_update(&self) -> BroadcastStats {
        let snapshot: Vec<Rc<dyn ManagedBinding>> = self.inner.borrow().active.clone();
        let mut stats = BroadcastStats {
            bindings: snapshot.len(),
            ..BroadcastStats::default()
        };
        for binding in &snapshot {
            match binding.update_targets() {
                Ok(written) => stats.targets_updated += written,
                Err(err) => {
                    stats.failures += 1;
                    warn!(error = %err, "binding update failed");
                }
            }
        }
        trace!(
            bindings = stats.bindings,
            targets = stats.targets_updated,
            failures = stats.failures,
            "broadcast complete"
        );
        stats
    }

    /// Registered bindings currently writing into `target`.
    #[must_use]
    pub fn find_target(&self, target: &Rc<dyn BindingTarget>) -> Vec<Rc<dyn ManagedBinding>> {
        self.bindings()
            .into_iter()
            .filter(|binding| binding.is_target(target))
            .collect()
    }

    /// Active bindings, including dead ones not yet cleaned up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().active.is_empty()
    }

    /// Registrations since the last cleanup pass.
    #[must_use]
    pub fn pending_inserts(&self) -> usize {
        self.inner.borrow().inserts_since_cleanup
    }

    /// Snapshot of the active list, in registration order.
    #[must_use]
    pub fn bindings(&self) -> Vec<Rc<dyn ManagedBinding>> {
        self.inner.borrow().active.clone()
    }

    /// Drop every binding.
    pub fn clear(&self) {
        // Take the list out first so binding destructors run without the borrow.
        let drained = {
            let mut inner = self.inner.borrow_mut();
            inner.inserts_since_cleanup = 0;
            std::mem::take(&mut inner.active)
        };
        drop(drained);
    }
}

fn binding_addr(binding: &Rc<dyn ManagedBinding>) -> *const () {
    Rc::as_ptr(binding).cast::<()>()
}
