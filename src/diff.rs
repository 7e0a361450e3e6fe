// src/diff.rs

//! Package diff construction
//!
//! Before any entry of a plan is applied, the engine walks every action
//! and records, per namespace, which entry keys the previously
//! installed packages provided and which keys the next versions
//! provide. The resulting [`PackageDiff`] is built once and read twice:
//! during entry application (to find previous content for three-way
//! merges) and during cleanup (to compute orphaned entries).
//!
//! Diff construction is partial-failure tolerant: a package whose
//! archive cannot be read contributes nothing and the plan proceeds
//! without it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::package::{EntryKey, Namespace, PackageHandle};
use crate::plan::{ActionKind, InstallationPlan};

/// Per-namespace maps of entry keys to the package handle providing
/// them
///
/// The diff owns every handle it references; ownership passes to the
/// cleanup coordinator, which closes them all once the plan is done.
#[derive(Default)]
pub struct PackageDiff {
    previous_entries: HashMap<Namespace, HashMap<EntryKey, Arc<PackageHandle>>>,
    next_entries: HashMap<Namespace, HashMap<EntryKey, Arc<PackageHandle>>>,
    handles: Vec<Arc<PackageHandle>>,
}

impl PackageDiff {
    /// Entries provided by the previously installed packages, per
    /// namespace
    pub fn previous_entries(&self) -> &HashMap<Namespace, HashMap<EntryKey, Arc<PackageHandle>>> {
        &self.previous_entries
    }

    /// Entries provided by the next package versions, per namespace
    pub fn next_entries(&self) -> &HashMap<Namespace, HashMap<EntryKey, Arc<PackageHandle>>> {
        &self.next_entries
    }

    /// The handle providing `key` in the previous version installed at
    /// `namespace`, if any
    pub fn previous_handle(
        &self,
        namespace: &Namespace,
        key: &EntryKey,
    ) -> Option<&Arc<PackageHandle>> {
        self.previous_entries.get(namespace).and_then(|m| m.get(key))
    }

    /// Every package handle the diff references
    pub fn handles(&self) -> &[Arc<PackageHandle>] {
        &self.handles
    }

    pub fn is_empty(&self) -> bool {
        self.previous_entries.is_empty() && self.next_entries.is_empty()
    }

    /// Drop the entry maps and handle list
    ///
    /// Called by cleanup once deletions are issued, so a retriggered
    /// completion listener sees an empty diff and does nothing.
    pub fn clear(&mut self) {
        self.previous_entries.clear();
        self.next_entries.clear();
        self.handles.clear();
    }

    fn record(
        map: &mut HashMap<Namespace, HashMap<EntryKey, Arc<PackageHandle>>>,
        namespace: &Namespace,
        handle: &Arc<PackageHandle>,
    ) -> Result<()> {
        let entries = handle.entries()?;
        let bucket = map.entry(namespace.clone()).or_default();
        for entry in entries {
            // Last writer wins: both sides represent the same
            // previously-installed content when keys collide.
            bucket.insert(entry.key, Arc::clone(handle));
        }
        Ok(())
    }
}

/// Builds a [`PackageDiff`] from an installation plan
#[derive(Default)]
pub struct DiffEngine;

impl DiffEngine {
    pub fn new() -> Self {
        Self
    }

    /// Walk the plan and build the previous/next entry maps
    ///
    /// Packages of a non-content type are ignored; archive errors on a
    /// single package are logged and that package is skipped.
    pub fn build_diff(&self, plan: &InstallationPlan) -> PackageDiff {
        let mut diff = PackageDiff::default();

        for action in &plan.actions {
            for handle in &action.previous {
                self.contribute(&mut diff, true, &action.namespace, handle);
            }
            if action.kind != ActionKind::Uninstall {
                if let Some(handle) = &action.next {
                    self.contribute(&mut diff, false, &action.namespace, handle);
                }
            }
        }

        debug!(
            "Built package diff: {} namespaces previous, {} namespaces next",
            diff.previous_entries.len(),
            diff.next_entries.len()
        );
        diff
    }

    fn contribute(
        &self,
        diff: &mut PackageDiff,
        previous: bool,
        namespace: &Namespace,
        handle: &Arc<PackageHandle>,
    ) {
        // Other package types are handled by unrelated installers.
        if !handle.package_type().is_content() {
            debug!("Skipping non-content package {}", handle.id());
            return;
        }

        diff.handles.push(Arc::clone(handle));

        let map = if previous {
            &mut diff.previous_entries
        } else {
            &mut diff.next_entries
        };
        if let Err(e) = PackageDiff::record(map, namespace, handle) {
            warn!(
                "Failed to read entries of package {}, skipping its contribution: {}",
                handle.id(),
                e
            );
        }
    }
}
