//! In-memory container backend.
//!
//! This module provides the [`crate::container::MemoryContainer`] backend that
//! implements [`crate::container::ContentContainer`] over a concurrent entry table.
//! It serves three purposes: test fixtures that need a class path without touching
//! disk, hosting content produced at runtime, and modelling cache overlays through
//! entries marked as cached.
//!
//! Unlike the archive and directory backends, a memory container chooses its kind at
//! construction. An in-memory container posing as an archive participates in package
//! sealing through an attached [`crate::container::Manifest`], which is how sealing
//! behavior is exercised without building archive files.
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::container::{ContentContainer, MemoryContainer};
//!
//! let container = MemoryContainer::archive("memory:/fixtures.jar");
//! container.add_class("com.example.Widget", vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52]);
//!
//! let entry = container.entry("com/example/Widget.class")?.unwrap();
//! assert_eq!(&entry.data[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
//! # Ok::<(), classgate::Error>(())
//! ```

use dashmap::DashMap;

use crate::{
    container::{ContainerEntry, ContainerKind, ContentContainer, Manifest},
    Result,
};

/// A container backed by a concurrent in-memory entry table.
///
/// Entries can be added while loaders already hold a reference to the container,
/// which mirrors content arriving in a running system. Lookups clone the stored
/// bytes, the table itself is never exposed.
///
/// # Examples
///
/// ```rust
/// use classgate::container::{ContainerKind, ContentContainer, MemoryContainer};
///
/// let container = MemoryContainer::directory("/srv/app/classes");
/// container.add_entry("banner.txt", b"hello".to_vec());
///
/// assert_eq!(container.kind(), ContainerKind::Directory);
/// assert_eq!(container.locations(), vec!["/srv/app/classes".to_string()]);
/// ```
#[derive(Debug)]
pub struct MemoryContainer {
    /// Physical location reported for this container
    location: String,
    /// Shape this container poses as
    kind: ContainerKind,
    /// Entry table, keyed by relative path
    entries: DashMap<String, ContainerEntry>,
    /// Optional manifest, only meaningful for the archive kind
    manifest: Option<Manifest>,
}

impl MemoryContainer {
    /// Create an empty container posing as an archive.
    ///
    /// # Arguments
    /// * `location` - Physical location to report, such as `memory:/app.jar`
    pub fn archive(location: impl Into<String>) -> MemoryContainer {
        MemoryContainer {
            location: location.into(),
            kind: ContainerKind::Archive,
            entries: DashMap::new(),
            manifest: None,
        }
    }

    /// Create an empty container posing as a directory.
    ///
    /// # Arguments
    /// * `location` - Physical location to report, such as `/srv/app/classes`
    pub fn directory(location: impl Into<String>) -> MemoryContainer {
        MemoryContainer {
            location: location.into(),
            kind: ContainerKind::Directory,
            entries: DashMap::new(),
            manifest: None,
        }
    }

    /// Attach a manifest to this container.
    ///
    /// Package attribution only consults manifests of archive containers, so this is
    /// a no-op in practice for the directory kind.
    #[must_use]
    pub fn with_manifest(mut self, manifest: Manifest) -> MemoryContainer {
        self.manifest = Some(manifest);
        self
    }

    /// Store an entry holding fresh bytes.
    ///
    /// An existing entry under the same path is replaced.
    ///
    /// # Arguments
    /// * `path` - Relative path of the entry
    /// * `data` - Bytes to store
    pub fn add_entry(&self, path: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(path.into(), ContainerEntry::fresh(data));
    }

    /// Store an entry holding bytes marked as served from a cache.
    ///
    /// Classes defined from cached entries skip system transformers unless the beta
    /// edition override is active.
    ///
    /// # Arguments
    /// * `path` - Relative path of the entry
    /// * `data` - Bytes to store
    pub fn add_cached_entry(&self, path: impl Into<String>, data: Vec<u8>) {
        self.entries
            .insert(path.into(), ContainerEntry::from_cache(data));
    }

    /// Store a class record under the path its binary name maps to.
    ///
    /// `com.example.Widget` is stored as `com/example/Widget.class`.
    ///
    /// # Arguments
    /// * `class_name` - Dot-separated binary name of the class
    /// * `data` - Class record bytes to store
    pub fn add_class(&self, class_name: &str, data: Vec<u8>) {
        self.add_entry(format!("{}.class", class_name.replace('.', "/")), data);
    }

    /// Remove the entry stored under a path, reporting whether one existed.
    ///
    /// # Arguments
    /// * `path` - Relative path of the entry
    pub fn remove_entry(&self, path: &str) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the container stores no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentContainer for MemoryContainer {
    fn kind(&self) -> ContainerKind {
        self.kind
    }

    fn entry(&self, path: &str) -> Result<Option<ContainerEntry>> {
        Ok(self.entries.get(path).map(|entry| entry.clone()))
    }

    fn locations(&self) -> Vec<String> {
        vec![self.location.clone()]
    }

    fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }
}
