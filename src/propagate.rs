// src/propagate.rs

//! Package propagation across namespace lifecycle events
//!
//! The external event bus reports namespaces being created, copied and
//! deleted. The propagator reacts by keeping package installations
//! consistent: root-installed content packages appear on new
//! namespaces, copied namespaces mirror the source's installations
//! (dependencies first), and deleted namespaces drop everything that
//! was not root-installed anyway.
//!
//! Handlers are stateless across events and treat every package as an
//! independent unit: one failing package is logged and the rest still
//! propagate. Per-namespace serialization against concurrently running
//! plans is the caller's responsibility.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PackageConfiguration;
use crate::error::Result;
use crate::package::{Namespace, PackageId, PackageType};

/// Namespace lifecycle events delivered by the external event bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamespaceEvent {
    Created(Namespace),
    Copied {
        source: Namespace,
        target: Namespace,
    },
    Deleted(Namespace),
}

/// One installed package as recorded by the installed-package registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub id: PackageId,
    pub package_type: PackageType,
    /// Whether the package is installed only as a dependency of
    /// another package, as opposed to a direct install
    pub dependency: bool,
}

/// External registry of which package is installed where
///
/// `install` runs the full installation of the package on the
/// namespace; `register` only records an installation that already
/// happened (used when mirroring a copied namespace, where the content
/// was copied together with the namespace itself).
pub trait InstalledRepository: Send + Sync {
    /// Packages installed at `namespace` (not including root coverage)
    fn installed_at(&self, namespace: &Namespace) -> Vec<InstalledPackage>;

    /// Whether any version of `name` is installed at `namespace`
    fn is_installed(&self, name: &str, namespace: &Namespace) -> bool;

    /// Declared dependencies of a package version
    fn dependencies(&self, id: &PackageId) -> Vec<PackageId>;

    /// Install `id` on `namespace`
    fn install(
        &self,
        id: &PackageId,
        namespace: &Namespace,
        dependency: bool,
        cfg: &PackageConfiguration,
    ) -> Result<()>;

    /// Record `id` as installed on `namespace` without re-applying its
    /// entries
    fn register(&self, id: &PackageId, namespace: &Namespace, dependency: bool) -> Result<()>;

    /// Uninstall `id` from `namespace`
    fn uninstall(&self, id: &PackageId, namespace: &Namespace, cfg: &PackageConfiguration)
        -> Result<()>;
}

/// Reacts to namespace lifecycle events
pub struct NamespacePropagator<'a> {
    repository: &'a dyn InstalledRepository,
}

impl<'a> NamespacePropagator<'a> {
    pub fn new(repository: &'a dyn InstalledRepository) -> Self {
        Self { repository }
    }

    /// Dispatch one event to its handler
    pub fn handle(&self, event: &NamespaceEvent, cfg: &PackageConfiguration) {
        match event {
            NamespaceEvent::Created(ns) => self.on_created(ns, cfg),
            NamespaceEvent::Copied { source, target } => self.on_copied(source, target, cfg),
            NamespaceEvent::Deleted(ns) => self.on_deleted(ns, cfg),
        }
    }

    /// A namespace was created: install root content packages on it
    pub fn on_created(&self, namespace: &Namespace, cfg: &PackageConfiguration) {
        let cfg = cfg.non_interactive().for_namespace(namespace.clone());

        for package in self.repository.installed_at(&Namespace::Root) {
            if !package.package_type.is_content() {
                continue;
            }
            if self.repository.is_installed(&package.id.name, namespace) {
                continue;
            }
            info!("Installing root package {} on new {}", package.id, namespace);
            if let Err(e) = self
                .repository
                .install(&package.id, namespace, package.dependency, &cfg)
            {
                warn!(
                    "Failed to install {} on new {}, continuing: {}",
                    package.id, namespace, e
                );
                cfg.report(&format!(
                    "Failed to install {} on {namespace}: {e}",
                    package.id
                ));
            }
        }
    }

    /// A namespace was copied: mirror the source's installations
    pub fn on_copied(&self, source: &Namespace, target: &Namespace, cfg: &PackageConfiguration) {
        let cfg = cfg.non_interactive().for_namespace(target.clone());

        for package in self.repository.installed_at(source) {
            if let Err(e) = self.copy_package(&package, target, &cfg) {
                warn!(
                    "Failed to copy {} from {} to {}, continuing: {}",
                    package.id, source, target, e
                );
                cfg.report(&format!(
                    "Failed to copy {} to {target}: {e}",
                    package.id
                ));
            }
        }
    }

    /// A namespace was deleted: drop its non-root installations
    pub fn on_deleted(&self, namespace: &Namespace, cfg: &PackageConfiguration) {
        let cfg = cfg.non_interactive().for_namespace(namespace.clone());

        for package in self.repository.installed_at(namespace) {
            if self.repository.is_installed(&package.id.name, &Namespace::Root) {
                // Root-installed packages cover every namespace and
                // stay untouched.
                continue;
            }
            info!("Uninstalling {} from deleted {}", package.id, namespace);
            if let Err(e) = self.repository.uninstall(&package.id, namespace, &cfg) {
                warn!(
                    "Failed to uninstall {} from {}: {}",
                    package.id, namespace, e
                );
                cfg.report(&format!(
                    "Failed to uninstall {} from {namespace}: {e}",
                    package.id
                ));
            }
        }
    }

    /// Register one package (dependencies first) on the copy target
    ///
    /// The dependency graph is assumed acyclic; the already-installed
    /// check bounds the recursion.
    fn copy_package(
        &self,
        package: &InstalledPackage,
        target: &Namespace,
        cfg: &PackageConfiguration,
    ) -> Result<()> {
        if self.repository.is_installed(&package.id.name, target)
            || self.repository.is_installed(&package.id.name, &Namespace::Root)
        {
            return Ok(());
        }

        for dependency in self.repository.dependencies(&package.id) {
            let installed = InstalledPackage {
                id: dependency,
                package_type: package.package_type.clone(),
                dependency: true,
            };
            self.copy_package(&installed, target, cfg)?;
        }

        info!("Registering {} on copied {}", package.id, target);
        self.repository
            .register(&package.id, target, package.dependency)
    }
}
