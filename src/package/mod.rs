// src/package/mod.rs

//! Identity and payload primitives for content packages
//!
//! A content package is a versioned bundle of addressable entries
//! ("pages"). Each entry carries a stable [`EntryKey`] that survives
//! across package versions, so two versions of the same package can be
//! diffed by key without ever recomputing identity from content.
//!
//! Namespaces are installation scopes. The distinguished
//! [`Namespace::Root`] scope covers every other namespace: an entry
//! visible at root is visible everywhere.

mod reader;

pub use reader::{ArchiveFormat, ArchiveHandle, OpenedArchive, PackageHandle, PackageReader};

#[cfg(test)]
pub(crate) use reader::test_support;

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

/// Scope prefix recognized for namespace identifiers
const WIKI_PREFIX: &str = "wiki:";

/// An installation scope
///
/// `Root` is the shared scope that implicitly covers all others. Every
/// other supported scope is a single wiki, written `wiki:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    /// The root scope, covering every namespace
    Root,
    /// A single wiki, identified by its id (without the `wiki:` prefix)
    Wiki(String),
}

impl Namespace {
    /// Build a wiki-scoped namespace from a wiki id
    pub fn wiki(id: impl Into<String>) -> Self {
        Namespace::Wiki(id.into())
    }

    /// Parse a namespace as received from the surrounding job layer
    ///
    /// `None` means the root scope. A `Some` value must be a `wiki:<id>`
    /// scope; anything else is rejected before any work happens.
    pub fn parse(value: Option<&str>) -> crate::Result<Self> {
        match value {
            None => Ok(Namespace::Root),
            Some(s) => match s.strip_prefix(WIKI_PREFIX) {
                Some(id) if !id.is_empty() => Ok(Namespace::Wiki(id.to_string())),
                _ => Err(crate::Error::UnsupportedNamespace(s.to_string())),
            },
        }
    }

    /// Check whether this is the root scope
    pub fn is_root(&self) -> bool {
        matches!(self, Namespace::Root)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Root => write!(f, "<root>"),
            Namespace::Wiki(id) => write!(f, "{}{}", WIKI_PREFIX, id),
        }
    }
}

/// The kind of content a package carries
///
/// Only [`PackageType::Content`] packages are handled by this engine;
/// entries from any other type are ignored wherever packages are
/// enumerated, and other installers deal with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PackageType {
    /// A content package (bundle of wiki pages)
    Content,
    /// Any other package type, kept verbatim for diagnostics
    Other(String),
}

impl PackageType {
    /// Check whether this engine handles the package
    pub fn is_content(&self) -> bool {
        matches!(self, PackageType::Content)
    }
}

/// Stable identity of a package: name plus version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub name: String,
    pub version: Version,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Stable, package-scoped identity of one content entry
///
/// Typically a page locator like `Space.Page`. Equality is what makes
/// two package versions comparable; it is never derived from content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryKey(String);

impl EntryKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One content item read out of a package archive
///
/// Read-only once produced by a [`PackageReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: EntryKey,
    pub content: Vec<u8>,
}

impl Entry {
    pub fn new(key: EntryKey, content: impl Into<Vec<u8>>) -> Self {
        Self {
            key,
            content: content.into(),
        }
    }
}
