// src/cleanup.rs

//! Orphan computation and end-of-plan cleanup
//!
//! Once every action of a plan has been applied, entries that the
//! previous package versions provided but no next version covers are
//! orphans and must be deleted. The subtraction is root-aware: a key
//! that moved from a namespace-local package into a root-installed one
//! is now served by the root copy and must not be deleted.
//!
//! Cleanup also owns the end of every package handle's life: whatever
//! happened before, each handle referenced by the diff is closed, and
//! the diff is cleared so a retriggered completion listener is a no-op.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::config::PackageConfiguration;
use crate::diff::PackageDiff;
use crate::package::{EntryKey, Namespace};
use crate::store::ContentStore;

/// Issues orphan deletions and releases all package handles
pub struct CleanupCoordinator<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> CleanupCoordinator<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Compute the orphaned entry keys per namespace
    ///
    /// A key in `previous_entries[ns]` is orphaned when neither
    /// `next_entries[ns]` nor `next_entries[root]` covers it.
    pub fn orphans(&self, diff: &PackageDiff) -> BTreeMap<Namespace, BTreeSet<EntryKey>> {
        let empty = std::collections::HashMap::new();
        let next_root = diff.next_entries().get(&Namespace::Root).unwrap_or(&empty);

        let mut orphans = BTreeMap::new();
        for (namespace, previous) in diff.previous_entries() {
            let next_same = diff.next_entries().get(namespace).unwrap_or(&empty);
            let keys: BTreeSet<EntryKey> = previous
                .keys()
                .filter(|key| !next_same.contains_key(*key) && !next_root.contains_key(*key))
                .cloned()
                .collect();
            if !keys.is_empty() {
                orphans.insert(namespace.clone(), keys);
            }
        }
        orphans
    }

    /// Delete orphans, close every handle and clear the diff
    ///
    /// Cleanup never prompts: deletions run under a non-interactive
    /// derivation of `cfg` with the acting user preserved. A failed
    /// deletion in one namespace is logged and does not block the
    /// others, and handles are released regardless of any outcome.
    pub fn cleanup(&self, diff: &mut PackageDiff, cfg: &PackageConfiguration) {
        let cfg = cfg.non_interactive();

        for (namespace, keys) in self.orphans(diff) {
            info!(
                "Deleting {} orphaned entries from {}",
                keys.len(),
                namespace
            );
            cfg.report(&format!(
                "Deleting {} orphaned entries from {}",
                keys.len(),
                namespace
            ));
            if let Err(e) = self.store.delete(&namespace, &keys) {
                warn!("Failed to delete orphaned entries from {}: {}", namespace, e);
                cfg.report(&format!("Orphan deletion failed for {namespace}: {e}"));
            }
        }

        for handle in diff.handles() {
            if handle.close() {
                debug!("Released package {}", handle.id());
            }
        }
        diff.clear();
    }
}
