// src/store.rs

//! Content store seam
//!
//! The per-entry content store (read/write/delete of a single page) is
//! an external collaborator. The engine drives it through the narrow
//! [`ContentStore`] trait: entry application reads and writes single
//! keys, cleanup issues one bulk delete per namespace.

use std::collections::BTreeSet;

use crate::config::UserRef;
use crate::error::Result;
use crate::package::{EntryKey, Namespace};

/// External content store interface
///
/// All failures surface as [`crate::Error::Store`]; the engine decides
/// per call site whether that aborts an action or is logged and
/// skipped.
pub trait ContentStore: Send + Sync {
    /// Read the current content of one entry, `None` if absent
    fn read(&self, namespace: &Namespace, key: &EntryKey) -> Result<Option<Vec<u8>>>;

    /// Write one entry, attributing the change to `author`
    fn write(
        &self,
        namespace: &Namespace,
        key: &EntryKey,
        content: &[u8],
        author: &UserRef,
    ) -> Result<()>;

    /// Delete a set of entries from one namespace in a single call
    fn delete(&self, namespace: &Namespace, keys: &BTreeSet<EntryKey>) -> Result<()>;
}
