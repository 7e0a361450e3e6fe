// src/package/reader.rs

//! Package archive access
//!
//! The archive/container format itself is an external collaborator,
//! consumed through the [`ArchiveFormat`] trait. This module owns the
//! lifecycle discipline around it: a [`PackageHandle`] wraps the open
//! archive resource, entry enumeration is restartable (each call
//! re-reads the index), and `close` is idempotent so that the cleanup
//! coordinator can release every handle referenced by a diff without
//! tracking which ones it already saw.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{Entry, EntryKey, Namespace, PackageId, PackageType};
use crate::error::{Error, Result};

/// External archive parser seam
///
/// Implementations parse the on-disk container format and expose its
/// identity, type and entries. This engine never inspects bytes of the
/// container itself.
pub trait ArchiveFormat: Send + Sync {
    /// Open an archive file, returning its identity and an open handle
    fn open(&self, path: &Path) -> Result<OpenedArchive>;
}

/// An archive opened by an [`ArchiveFormat`]
pub struct OpenedArchive {
    pub id: PackageId,
    pub package_type: PackageType,
    pub handle: Box<dyn ArchiveHandle>,
}

/// Open resource over one archive's entry index
///
/// Enumeration is finite and restartable: every `entries` call re-reads
/// the index. Dropping the handle releases the underlying resource.
pub trait ArchiveHandle: Send {
    fn entries(&mut self) -> Result<Vec<Entry>>;
}

/// An open package bound to the namespace it is being processed for
///
/// The handle owns the archive resource. It is created wherever a
/// component needs to inspect a package's entries and is closed exactly
/// once, by the cleanup coordinator, after all diff consumers have
/// finished.
pub struct PackageHandle {
    id: PackageId,
    package_type: PackageType,
    namespace: Namespace,
    archive: Mutex<Option<Box<dyn ArchiveHandle>>>,
}

impl PackageHandle {
    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn package_type(&self) -> &PackageType {
        &self.package_type
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Enumerate the entries of this package
    ///
    /// # Errors
    /// Returns [`Error::Archive`] if the handle was already closed or
    /// the archive index cannot be read.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut guard = self.archive.lock().unwrap_or_else(|e| e.into_inner());
        let archive = guard
            .as_mut()
            .ok_or_else(|| Error::Archive(format!("package {} already closed", self.id)))?;
        archive.entries()
    }

    /// Look up a single entry by key
    pub fn entry(&self, key: &EntryKey) -> Result<Option<Entry>> {
        Ok(self.entries()?.into_iter().find(|e| &e.key == key))
    }

    /// Release the archive resource
    ///
    /// Returns `true` the first time, `false` on every later call.
    /// Never reentrant: the resource is taken out under the lock before
    /// it is dropped.
    pub fn close(&self) -> bool {
        let taken = self
            .archive
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match taken {
            Some(archive) => {
                debug!("Closing package archive {}", self.id);
                drop(archive);
                true
            }
            None => false,
        }
    }

    /// Check whether the archive resource was already released
    pub fn is_closed(&self) -> bool {
        self.archive
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }
}

impl std::fmt::Debug for PackageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageHandle")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Opens package files through a configured [`ArchiveFormat`]
pub struct PackageReader {
    format: Arc<dyn ArchiveFormat>,
}

impl PackageReader {
    pub fn new(format: Arc<dyn ArchiveFormat>) -> Self {
        Self { format }
    }

    /// Open a package file for processing in `namespace`
    ///
    /// # Errors
    /// Returns [`Error::Archive`] when the file is malformed or
    /// unreadable; the caller decides whether that aborts the enclosing
    /// action or only skips this package.
    pub fn open(&self, path: &Path, namespace: Namespace) -> Result<Arc<PackageHandle>> {
        let opened = self.format.open(path)?;
        debug!("Opened package {} for {}", opened.id, namespace);
        Ok(Arc::new(PackageHandle {
            id: opened.id,
            package_type: opened.package_type,
            namespace,
            archive: Mutex::new(Some(opened.handle)),
        }))
    }

    /// Wrap an already-opened archive, binding it to `namespace`
    ///
    /// Used when the surrounding job layer resolved and opened the
    /// package itself (the usual path for planned installs).
    pub fn adopt(&self, opened: OpenedArchive, namespace: Namespace) -> Arc<PackageHandle> {
        Arc::new(PackageHandle {
            id: opened.id,
            package_type: opened.package_type,
            namespace,
            archive: Mutex::new(Some(opened.handle)),
        })
    }
}
