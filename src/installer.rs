// src/installer.rs

//! Per-action entry application
//!
//! The external job runner walks the plan action by action. For each
//! INSTALL or UPGRADE action this module checks the admin gate, then
//! imports every entry of the next package: current store content and
//! previous package content feed the conflict resolver, and the
//! resolved content is written back attributed to the acting user.
//! UNINSTALL actions apply no entries; the cleanup pass deletes their
//! orphans.
//!
//! Failure granularity follows the error-handling contract: a denied
//! rights check or a store failure aborts the whole action before or at
//! the failing entry, while an unanswered conflict skips only
//! that entry.

use tracing::{debug, info, warn};

use crate::access::{AccessGate, Right};
use crate::config::PackageConfiguration;
use crate::conflict::ConflictResolver;
use crate::diff::PackageDiff;
use crate::error::{Error, Result};
use crate::plan::{Action, ActionKind};
use crate::store::ContentStore;

/// What applying one action did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Entries written to the store
    pub written: usize,
    /// Entries left untouched (already at target content)
    pub unchanged: usize,
    /// Entries skipped because their conflict was left unanswered
    pub skipped: usize,
}

/// Applies one plan action's entries to the content store
pub struct PackageInstaller<'a> {
    store: &'a dyn ContentStore,
    resolver: &'a ConflictResolver,
    gate: &'a AccessGate<'a>,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        resolver: &'a ConflictResolver,
        gate: &'a AccessGate<'a>,
    ) -> Self {
        Self {
            store,
            resolver,
            gate,
        }
    }

    /// Apply one action, consulting `diff` for previous content
    ///
    /// # Errors
    /// [`Error::AccessDenied`] before any mutation when the gate
    /// refuses, [`Error::Store`] when reading or writing an entry
    /// fails (the action is aborted at that entry), and
    /// [`Error::Cancelled`] when an interactive wait was cancelled.
    pub fn apply_action(
        &self,
        action: &Action,
        diff: &PackageDiff,
        cfg: &PackageConfiguration,
    ) -> Result<ApplyOutcome> {
        self.gate
            .check_right(Some(&action.namespace), Right::Admin, None, cfg)?;

        if action.kind == ActionKind::Uninstall {
            // Deletion happens in the cleanup pass, once orphans are
            // known across the whole plan.
            debug!("No entries to apply for {}", action.description());
            return Ok(ApplyOutcome::default());
        }

        let Some(next) = &action.next else {
            return Err(Error::Archive(format!(
                "{} action on {} has no package",
                action.kind, action.namespace
            )));
        };
        if !next.package_type().is_content() {
            debug!("Skipping non-content package {}", next.id());
            return Ok(ApplyOutcome::default());
        }

        info!("{}", action.description());
        cfg.report(&action.description());

        let author = cfg.author();
        let mut outcome = ApplyOutcome::default();

        for entry in next.entries()? {
            let current = self.store.read(&action.namespace, &entry.key)?;
            let previous = match diff.previous_handle(&action.namespace, &entry.key) {
                Some(handle) => handle.entry(&entry.key)?.map(|e| e.content),
                None => None,
            };

            let resolved = match self.resolver.resolve(
                &entry.key,
                current.as_deref(),
                previous.as_deref(),
                &entry.content,
                cfg,
            ) {
                Ok(content) => content,
                Err(Error::AnswerRequired(key)) => {
                    warn!("Unanswered conflict on {}, entry skipped", key);
                    cfg.report(&format!("Entry {key} skipped: conflict left unanswered"));
                    outcome.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if current.as_deref() == Some(resolved.as_slice()) {
                outcome.unchanged += 1;
                continue;
            }
            self.store
                .write(&action.namespace, &entry.key, &resolved, &author)?;
            outcome.written += 1;
        }

        debug!(
            "Applied {}: {} written, {} unchanged, {} skipped",
            action.description(),
            outcome.written,
            outcome.unchanged,
            outcome.skipped
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{ExecutionContext, RightsService};
    use crate::config::UserRef;
    use crate::conflict::{ConflictAction, ConflictAnswer, ConflictAnswerer, ConflictQuestion};
    use crate::diff::DiffEngine;
    use crate::package::test_support::content_handle;
    use crate::package::{EntryKey, Namespace};
    use crate::plan::InstallationPlan;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::{Arc, Mutex};

    /// In-memory content store
    #[derive(Default)]
    struct MemoryStore {
        pages: Mutex<HashMap<(Namespace, EntryKey), (Vec<u8>, UserRef)>>,
        fail_writes: bool,
    }

    impl MemoryStore {
        fn seed(&self, namespace: &Namespace, key: &str, content: &[u8]) {
            self.pages.lock().unwrap().insert(
                (namespace.clone(), EntryKey::new(key)),
                (content.to_vec(), UserRef::new("seed")),
            );
        }

        fn page(&self, namespace: &Namespace, key: &str) -> Option<(Vec<u8>, UserRef)> {
            self.pages
                .lock()
                .unwrap()
                .get(&(namespace.clone(), EntryKey::new(key)))
                .cloned()
        }
    }

    impl ContentStore for MemoryStore {
        fn read(&self, namespace: &Namespace, key: &EntryKey) -> Result<Option<Vec<u8>>> {
            Ok(self
                .pages
                .lock()
                .unwrap()
                .get(&(namespace.clone(), key.clone()))
                .map(|(content, _)| content.clone()))
        }

        fn write(
            &self,
            namespace: &Namespace,
            key: &EntryKey,
            content: &[u8],
            author: &UserRef,
        ) -> Result<()> {
            if self.fail_writes {
                return Err(Error::Store("write refused".to_string()));
            }
            self.pages.lock().unwrap().insert(
                (namespace.clone(), key.clone()),
                (content.to_vec(), author.clone()),
            );
            Ok(())
        }

        fn delete(&self, namespace: &Namespace, keys: &BTreeSet<EntryKey>) -> Result<()> {
            let mut pages = self.pages.lock().unwrap();
            for key in keys {
                pages.remove(&(namespace.clone(), key.clone()));
            }
            Ok(())
        }
    }

    struct AllowAll;
    impl RightsService for AllowAll {
        fn has_right(
            &self,
            _user: &UserRef,
            _right: Right,
            _namespace: &Namespace,
            _document: Option<&EntryKey>,
        ) -> bool {
            true
        }
    }

    struct DenyAll;
    impl RightsService for DenyAll {
        fn has_right(
            &self,
            _user: &UserRef,
            _right: Right,
            _namespace: &Namespace,
            _document: Option<&EntryKey>,
        ) -> bool {
            false
        }
    }

    struct PlainContext(Mutex<Namespace>);
    impl PlainContext {
        fn new() -> Self {
            Self(Mutex::new(Namespace::Root))
        }
    }
    impl ExecutionContext for PlainContext {
        fn current_namespace(&self) -> Namespace {
            self.0.lock().unwrap().clone()
        }
        fn set_namespace(&self, namespace: Namespace) {
            *self.0.lock().unwrap() = namespace;
        }
    }

    fn wiki() -> Namespace {
        Namespace::wiki("W")
    }

    fn cfg_as(user: &str) -> PackageConfiguration {
        let mut cfg = PackageConfiguration::new(wiki());
        cfg.acting_user = Some(UserRef::new(user));
        cfg
    }

    #[test]
    fn test_install_writes_entries_with_author() {
        let store = MemoryStore::default();
        let resolver = ConflictResolver::new();
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let next = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "content a")]);
        let action = Action::install(wiki(), next);
        let plan = InstallationPlan::new(vec![action]);
        let diff = DiffEngine::new().build_diff(&plan);

        let outcome = installer
            .apply_action(&plan.actions[0], &diff, &cfg_as("alice"))
            .unwrap();

        assert_eq!(outcome.written, 1);
        let (content, author) = store.page(&wiki(), "Main.A").unwrap();
        assert_eq!(content, b"content a");
        assert_eq!(author, UserRef::new("alice"));
    }

    #[test]
    fn test_install_without_user_attributes_superadmin() {
        let store = MemoryStore::default();
        let resolver = ConflictResolver::new();
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let next = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "a")]);
        let plan = InstallationPlan::new(vec![Action::install(wiki(), next)]);
        let diff = DiffEngine::new().build_diff(&plan);

        installer
            .apply_action(&plan.actions[0], &diff, &PackageConfiguration::new(wiki()))
            .unwrap();

        let (_, author) = store.page(&wiki(), "Main.A").unwrap();
        assert_eq!(author, UserRef::superadmin());
    }

    #[test]
    fn test_denied_gate_aborts_before_mutation() {
        let store = MemoryStore::default();
        let resolver = ConflictResolver::new();
        let rights = DenyAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let next = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "a")]);
        let plan = InstallationPlan::new(vec![Action::install(wiki(), next)]);
        let diff = DiffEngine::new().build_diff(&plan);

        let err = installer
            .apply_action(&plan.actions[0], &diff, &cfg_as("alice"))
            .unwrap_err();
        assert!(matches!(err, Error::AccessDenied { .. }));
        assert!(store.page(&wiki(), "Main.A").is_none());
    }

    #[test]
    fn test_upgrade_preserves_local_edit_via_merge() {
        let store = MemoryStore::default();
        // Locally edited line 1; upgrade changes line 3.
        store.seed(&wiki(), "Main.A", b"local\nmiddle\nold\n");

        let resolver = ConflictResolver::new();
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let previous = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "base\nmiddle\nold\n")]);
        let next = content_handle("test", (2, 0, 0), wiki(), &[("Main.A", "base\nmiddle\nnew\n")]);
        let plan = InstallationPlan::new(vec![Action::upgrade(wiki(), vec![previous], next)]);
        let diff = DiffEngine::new().build_diff(&plan);

        installer
            .apply_action(&plan.actions[0], &diff, &cfg_as("alice"))
            .unwrap();

        let (content, _) = store.page(&wiki(), "Main.A").unwrap();
        assert_eq!(content, b"local\nmiddle\nnew\n");
    }

    #[test]
    fn test_unchanged_entries_are_not_rewritten() {
        let store = MemoryStore::default();
        store.seed(&wiki(), "Main.A", b"same");

        let resolver = ConflictResolver::new();
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let previous = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "same")]);
        let next = content_handle("test", (2, 0, 0), wiki(), &[("Main.A", "same")]);
        let plan = InstallationPlan::new(vec![Action::upgrade(wiki(), vec![previous], next)]);
        let diff = DiffEngine::new().build_diff(&plan);

        let outcome = installer
            .apply_action(&plan.actions[0], &diff, &cfg_as("alice"))
            .unwrap();

        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.unchanged, 1);
        // The seed author is untouched.
        let (_, author) = store.page(&wiki(), "Main.A").unwrap();
        assert_eq!(author, UserRef::new("seed"));
    }

    #[test]
    fn test_store_failure_aborts_action() {
        let store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let resolver = ConflictResolver::new();
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let next = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "a"), ("Main.B", "b")]);
        let plan = InstallationPlan::new(vec![Action::install(wiki(), next)]);
        let diff = DiffEngine::new().build_diff(&plan);

        let err = installer
            .apply_action(&plan.actions[0], &diff, &cfg_as("alice"))
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[test]
    fn test_incomplete_custom_answer_skips_entry_only() {
        struct CustomWithoutContent;
        impl ConflictAnswerer for CustomWithoutContent {
            fn answer(&self, _question: &ConflictQuestion) -> Result<ConflictAnswer> {
                Ok(ConflictAnswer::take(ConflictAction::Custom))
            }
        }

        let store = MemoryStore::default();
        store.seed(&wiki(), "Main.A", b"locally edited");

        let resolver = ConflictResolver::with_answerer(Arc::new(CustomWithoutContent));
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let previous = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "base")]);
        let next = content_handle(
            "test",
            (2, 0, 0),
            wiki(),
            &[("Main.A", "upstream"), ("Main.B", "fresh")],
        );
        let plan = InstallationPlan::new(vec![Action::upgrade(wiki(), vec![previous], next)]);
        let diff = DiffEngine::new().build_diff(&plan);

        let mut cfg = cfg_as("alice");
        cfg.interactive = true;
        let outcome = installer.apply_action(&plan.actions[0], &diff, &cfg).unwrap();

        // The conflicted entry was skipped; the fresh one still landed.
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.written, 1);
        assert_eq!(store.page(&wiki(), "Main.A").unwrap().0, b"locally edited");
        assert_eq!(store.page(&wiki(), "Main.B").unwrap().0, b"fresh");
    }

    #[test]
    fn test_uninstall_applies_no_entries() {
        let store = MemoryStore::default();
        store.seed(&wiki(), "Main.A", b"a");

        let resolver = ConflictResolver::new();
        let rights = AllowAll;
        let context = PlainContext::new();
        let gate = AccessGate::new(&rights, &context);
        let installer = PackageInstaller::new(&store, &resolver, &gate);

        let previous = content_handle("test", (1, 0, 0), wiki(), &[("Main.A", "a")]);
        let plan = InstallationPlan::new(vec![Action::uninstall(wiki(), vec![previous])]);
        let diff = DiffEngine::new().build_diff(&plan);

        let outcome = installer
            .apply_action(&plan.actions[0], &diff, &cfg_as("alice"))
            .unwrap();
        assert_eq!(outcome, ApplyOutcome::default());
        // Content is still there; cleanup deletes orphans later.
        assert!(store.page(&wiki(), "Main.A").is_some());
    }
}
