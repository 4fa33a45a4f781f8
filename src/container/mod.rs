//! Class path containers supplying class records and resources to loaders.
//!
//! This module provides the [`crate::container::ContentContainer`] abstraction that
//! loaders resolve class names and resource paths against. A loader's class path is an
//! ordered list of containers, each one backed by an archive, an exploded directory or
//! an in-memory table, and every container answers the same question: for a relative
//! path, produce the bytes stored under it together with provenance for diagnostics,
//! package attribution and protection domains.
//!
//! # Architecture
//!
//! Containers are trait objects shared behind [`crate::container::ContainerRef`] so a
//! single archive can back several loaders at once. The trait deliberately exposes
//! byte-level access only. Interpretation of the bytes, class record validation,
//! transformation and definition, happens in the loader layer. This keeps the
//! container implementations small and independently testable:
//!
//! - **Archive access** - [`crate::container::ArchiveContainer`] indexes a stored
//!   archive through memory-mapped I/O
//! - **Directory access** - [`crate::container::DirectoryContainer`] reads an exploded
//!   class path from disk
//! - **In-memory access** - [`crate::container::MemoryContainer`] serves entries from
//!   a concurrent table, used by tests and generated content
//!
//! # Key Components
//!
//! - [`crate::container::ContentContainer`] - The container trait
//! - [`crate::container::ContainerEntry`] - Bytes for one entry plus its cache marker
//! - [`crate::container::Resource`] - Bytes for one resource plus its resolved URL
//! - [`crate::container::Manifest`] - Parsed archive manifest for package attribution
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::container::{ContainerKind, ContentContainer, MemoryContainer};
//!
//! let container = MemoryContainer::archive("memory:/demo.jar");
//! container.add_entry("com/example/Widget.class", vec![0xCA, 0xFE, 0xBA, 0xBE]);
//!
//! assert_eq!(container.kind(), ContainerKind::Archive);
//! assert!(container.entry("com/example/Widget.class")?.is_some());
//! assert_eq!(
//!     container.entry_url("com/example/Widget.class"),
//!     "memory:/demo.jar!/com/example/Widget.class"
//! );
//! # Ok::<(), classgate::Error>(())
//! ```
//!
//! # Integration
//!
//! This module integrates with:
//! - [`crate::loader`] - Loaders walk container lists to find class records
//! - [`crate::loader::ByteResourceInformation`] - Carries the supplying container
//!   through the transformation pipeline
//! - [`crate::loader::Package`] - Package attributes come from archive manifests

mod archive;
mod directory;
mod manifest;
mod memory;

pub use archive::ArchiveContainer;
pub use directory::DirectoryContainer;
pub use manifest::{Manifest, PackageAttributes};
pub use memory::MemoryContainer;

use std::sync::Arc;

use crate::Result;

/// A reference to a shared content container.
///
/// Containers are immutable once handed to loaders, so they are shared freely between
/// the loaders whose class paths include them.
pub type ContainerRef = Arc<dyn ContentContainer>;

/// The physical shape of a container.
///
/// The kind decides two behaviors in the loader layer: entry URL formatting and
/// package sealing. Only [`crate::container::ContainerKind::Archive`] containers carry
/// a manifest, so classes served from directories always produce unsealed packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ContainerKind {
    /// A packaged archive with a central index and an optional manifest
    Archive,
    /// An exploded directory tree on disk
    Directory,
}

/// The bytes stored under a single container entry.
///
/// The `cached` marker records whether the bytes came from a pre-processed cache
/// rather than the original class path content. The transformation pipeline uses it
/// to decide whether system transformers still need to run, their output is already
/// baked into cached bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Raw bytes of the entry
    pub data: Vec<u8>,
    /// Whether the bytes were served from a pre-processed cache
    pub cached: bool,
}

impl ContainerEntry {
    /// Create an entry holding freshly read bytes.
    pub fn fresh(data: Vec<u8>) -> ContainerEntry {
        ContainerEntry {
            data,
            cached: false,
        }
    }

    /// Create an entry holding bytes served from a pre-processed cache.
    pub fn from_cache(data: Vec<u8>) -> ContainerEntry {
        ContainerEntry { data, cached: true }
    }
}

/// A resolved resource, bytes plus the URL they were found under.
///
/// Returned by resource lookups on loaders. The location is the entry URL of the
/// supplying container, so callers can report where a resource came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Raw bytes of the resource
    pub data: Vec<u8>,
    /// Entry URL the resource was resolved from
    pub location: String,
}

/// Byte-level access to one unit of class path content.
///
/// Implementations serve entries by relative path and report where they live. All
/// methods are safe to call concurrently, loaders walk shared container lists from
/// many threads at once.
///
/// # Examples
///
/// ```rust
/// use classgate::container::{ContentContainer, MemoryContainer};
///
/// let container = MemoryContainer::directory("/opt/app/classes");
/// container.add_entry("settings.properties", b"mode=verbose".to_vec());
///
/// let entry = container.entry("settings.properties")?.unwrap();
/// assert_eq!(entry.data, b"mode=verbose");
/// assert!(!entry.cached);
/// assert!(container.entry("missing.properties")?.is_none());
/// # Ok::<(), classgate::Error>(())
/// ```
pub trait ContentContainer: Send + Sync {
    /// The physical shape of this container.
    fn kind(&self) -> ContainerKind;

    /// Read the entry stored under a relative path.
    ///
    /// Returns `Ok(None)` when the container has no such entry. Paths use `/` as the
    /// separator regardless of platform.
    ///
    /// # Arguments
    /// * `path` - Relative path of the entry, such as `com/example/Widget.class`
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the underlying storage fails while
    /// reading an entry that exists.
    fn entry(&self, path: &str) -> Result<Option<ContainerEntry>>;

    /// All physical locations backing this container.
    ///
    /// Most containers are backed by exactly one location. The order is significant,
    /// the first location is the container's identity for protection domains.
    fn locations(&self) -> Vec<String>;

    /// The parsed manifest of this container, when it carries one.
    ///
    /// Only archive containers have manifests. The default returns `None`.
    fn manifest(&self) -> Option<&Manifest> {
        None
    }

    /// The primary physical location of this container.
    ///
    /// This is the string loaders use as the code source of classes defined from this
    /// container. Defaults to the first entry of
    /// [`crate::container::ContentContainer::locations`].
    fn physical_location(&self) -> String {
        self.locations().into_iter().next().unwrap_or_default()
    }

    /// Format the URL of an entry inside this container.
    ///
    /// Archive entries use the `location!/path` form, directory entries join with a
    /// `/`. The URL is informational, it is reported alongside resource bytes.
    ///
    /// # Arguments
    /// * `path` - Relative path of the entry
    fn entry_url(&self, path: &str) -> String {
        let location = self.physical_location();
        match self.kind() {
            ContainerKind::Archive => format!("{location}!/{path}"),
            ContainerKind::Directory => {
                format!("{}/{}", location.trim_end_matches('/'), path)
            }
        }
    }

    /// Whether the container stores an entry under the given path.
    ///
    /// # Arguments
    /// * `path` - Relative path of the entry
    fn has_entry(&self, path: &str) -> bool {
        matches!(self.entry(path), Ok(Some(_)))
    }
}
