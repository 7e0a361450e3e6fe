// tests/common/mod.rs

//! Shared in-memory collaborators for integration tests
//!
//! The engine consumes its archive parser, content store and rights
//! service through traits; these fakes stand in for all three so a
//! whole plan can run end to end in memory.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use pagepack::{
    ArchiveFormat, ArchiveHandle, ContentStore, Entry, EntryKey, ExecutionContext, Namespace,
    OpenedArchive, PackageId, PackageType, Result, Right, RightsService, UserRef,
};
use semver::Version;

/// Archive handle serving a staged entry list
pub struct MemoryArchive {
    entries: Vec<Entry>,
}

impl ArchiveHandle for MemoryArchive {
    fn entries(&mut self) -> Result<Vec<Entry>> {
        Ok(self.entries.clone())
    }
}

/// Archive format fake: packages are staged per path ahead of time
#[derive(Default)]
pub struct FakeArchiveFormat {
    staged: Mutex<HashMap<PathBuf, (PackageId, PackageType, Vec<Entry>)>>,
}

impl FakeArchiveFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a content package under `path`
    pub fn stage(
        &self,
        path: &Path,
        name: &str,
        version: (u64, u64, u64),
        entries: &[(&str, &str)],
    ) {
        let entries = entries
            .iter()
            .map(|(k, c)| Entry::new(EntryKey::new(*k), c.as_bytes()))
            .collect();
        self.staged.lock().unwrap().insert(
            path.to_path_buf(),
            (
                PackageId::new(name, Version::new(version.0, version.1, version.2)),
                PackageType::Content,
                entries,
            ),
        );
    }
}

impl ArchiveFormat for FakeArchiveFormat {
    fn open(&self, path: &Path) -> Result<OpenedArchive> {
        let staged = self.staged.lock().unwrap();
        let (id, package_type, entries) = staged
            .get(path)
            .ok_or_else(|| pagepack::Error::Archive(format!("malformed archive {path:?}")))?;
        Ok(OpenedArchive {
            id: id.clone(),
            package_type: package_type.clone(),
            handle: Box::new(MemoryArchive {
                entries: entries.clone(),
            }),
        })
    }
}

/// Archive format parsing a plain-text manifest from a real file
///
/// First line is `<name> <version>`, each following line one
/// `<key>=<content>` entry. Stands in for the container parser when a
/// test needs the open path to touch the filesystem.
pub struct TextArchiveFormat;

impl ArchiveFormat for TextArchiveFormat {
    fn open(&self, path: &Path) -> Result<OpenedArchive> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| pagepack::Error::Archive(format!("unreadable archive {path:?}: {e}")))?;
        let mut lines = text.lines();
        let header = lines
            .next()
            .ok_or_else(|| pagepack::Error::Archive(format!("empty archive {path:?}")))?;
        let (name, version) = header
            .split_once(' ')
            .ok_or_else(|| pagepack::Error::Archive(format!("missing header in {path:?}")))?;
        let version = Version::parse(version)
            .map_err(|e| pagepack::Error::Archive(format!("bad version in {path:?}: {e}")))?;

        let mut entries = Vec::new();
        for line in lines {
            let (key, content) = line
                .split_once('=')
                .ok_or_else(|| pagepack::Error::Archive(format!("malformed entry line {line:?}")))?;
            entries.push(Entry::new(EntryKey::new(key), content.as_bytes()));
        }
        Ok(OpenedArchive {
            id: PackageId::new(name, version),
            package_type: PackageType::Content,
            handle: Box::new(MemoryArchive { entries }),
        })
    }
}

/// In-memory content store recording authors and deletions
#[derive(Default)]
pub struct MemoryStore {
    pages: Mutex<HashMap<(Namespace, EntryKey), (Vec<u8>, UserRef)>>,
    deletes: Mutex<Vec<(Namespace, BTreeSet<EntryKey>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, namespace: &Namespace, key: &str, content: &[u8]) {
        self.pages.lock().unwrap().insert(
            (namespace.clone(), EntryKey::new(key)),
            (content.to_vec(), UserRef::new("seed")),
        );
    }

    pub fn content(&self, namespace: &Namespace, key: &str) -> Option<Vec<u8>> {
        self.pages
            .lock()
            .unwrap()
            .get(&(namespace.clone(), EntryKey::new(key)))
            .map(|(content, _)| content.clone())
    }

    pub fn author(&self, namespace: &Namespace, key: &str) -> Option<UserRef> {
        self.pages
            .lock()
            .unwrap()
            .get(&(namespace.clone(), EntryKey::new(key)))
            .map(|(_, author)| author.clone())
    }

    pub fn delete_calls(&self) -> Vec<(Namespace, BTreeSet<EntryKey>)> {
        self.deletes.lock().unwrap().clone()
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
        self.pages.lock().unwrap().insert(
            (namespace.clone(), key.clone()),
            (content.to_vec(), author.clone()),
        );
        Ok(())
    }

    fn delete(&self, namespace: &Namespace, keys: &BTreeSet<EntryKey>) -> Result<()> {
        self.deletes
            .lock()
            .unwrap()
            .push((namespace.clone(), keys.clone()));
        let mut pages = self.pages.lock().unwrap();
        for key in keys {
            pages.remove(&(namespace.clone(), key.clone()));
        }
        Ok(())
    }
}

/// Rights service granting everything to a fixed set of admins
pub struct AdminsOnly {
    admins: Vec<UserRef>,
}

impl AdminsOnly {
    pub fn new(admins: &[&str]) -> Self {
        Self {
            admins: admins.iter().map(|a| UserRef::new(*a)).collect(),
        }
    }
}

impl RightsService for AdminsOnly {
    fn has_right(
        &self,
        user: &UserRef,
        _right: Right,
        _namespace: &Namespace,
        _document: Option<&EntryKey>,
    ) -> bool {
        self.admins.contains(user)
    }
}

/// Plain mutable execution context
pub struct TestContext {
    current: Mutex<Namespace>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Namespace::Root),
        }
    }
}

impl ExecutionContext for TestContext {
    fn current_namespace(&self) -> Namespace {
        self.current.lock().unwrap().clone()
    }

    fn set_namespace(&self, namespace: Namespace) {
        *self.current.lock().unwrap() = namespace;
    }
}
