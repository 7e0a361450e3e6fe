// src/lib.rs

//! Pagepack: content-package installation engine
//!
//! The engine behind installing, upgrading and removing versioned
//! bundles of wiki pages ("content packages") across isolated
//! namespaces. A package can be installed at different versions in
//! different namespaces, and once at the shared root namespace, which
//! implicitly covers all the others.
//!
//! # Architecture
//!
//! - Diff-first: a plan is turned into per-namespace previous/next
//!   entry maps before anything is written
//! - Three-way conflicts: locally modified entries are merged, with an
//!   optional human-in-the-loop answer channel
//! - Root-aware cleanup: entries promoted to the root namespace are
//!   never deleted from the namespaces they used to live in
//! - Scoped resources: archive handles are owned by the diff and
//!   released exactly once by the cleanup pass
//!
//! The job framework, content store, rights service, event bus and
//! archive parser are external collaborators consumed through narrow
//! traits; this crate is the library they drive.

pub mod access;
pub mod cleanup;
pub mod config;
pub mod conflict;
pub mod diff;
mod error;
pub mod installer;
pub mod package;
pub mod plan;
pub mod progress;
pub mod propagate;
pub mod store;

pub use access::{AccessGate, ContextGuard, ExecutionContext, Right, RightsService};
pub use cleanup::CleanupCoordinator;
pub use config::{PackageConfiguration, UserRef};
pub use conflict::{
    ConflictAction, ConflictAnswer, ConflictAnswerer, ConflictQuestion, ConflictResolver,
};
pub use diff::{DiffEngine, PackageDiff};
pub use error::{Error, Result};
pub use installer::{ApplyOutcome, PackageInstaller};
pub use package::{
    ArchiveFormat, ArchiveHandle, Entry, EntryKey, Namespace, OpenedArchive, PackageHandle,
    PackageId, PackageReader, PackageType,
};
pub use plan::{Action, ActionKind, InstallationPlan};
pub use progress::{CollectingStatus, JobStatus, SilentStatus};
pub use propagate::{InstalledPackage, InstalledRepository, NamespaceEvent, NamespacePropagator};
pub use store::ContentStore;
