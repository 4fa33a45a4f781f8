//! Directory container backend.
//!
//! This module provides the [`crate::container::DirectoryContainer`] backend that
//! implements [`crate::container::ContentContainer`] for an exploded class path
//! rooted at a directory on disk. Entries are resolved by joining the requested
//! relative path onto the root, with path traversal rejected before any filesystem
//! access happens.
//!
//! Directory containers never carry a manifest, so packages defined from them are
//! always unsealed and carry no specification or implementation attributes.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use classgate::container::{ContentContainer, DirectoryContainer};
//!
//! let container = DirectoryContainer::new("/srv/app/WEB-INF/classes");
//! if let Some(entry) = container.entry("com/example/Widget.class")? {
//!     println!("read {} bytes", entry.data.len());
//! }
//! # Ok::<(), classgate::Error>(())
//! ```

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use crate::{
    container::{ContainerEntry, ContainerKind, ContentContainer},
    Result,
};

/// A container rooted at a directory on disk.
///
/// Lookups read entry bytes with plain file I/O on every call, there is no caching
/// layer. Requested paths must be plain relative paths, any component that is not a
/// normal name, such as `..`, a root or a prefix, makes the lookup miss instead of
/// escaping the root.
#[derive(Debug)]
pub struct DirectoryContainer {
    /// Root directory all entry paths are resolved against
    root: PathBuf,
    /// Display form of the root, reported as the physical location
    location: String,
}

impl DirectoryContainer {
    /// Create a container rooted at the given directory.
    ///
    /// The directory does not have to exist yet, lookups against a missing root
    /// simply find no entries.
    ///
    /// # Arguments
    /// * `root` - Directory the class path content lives under
    pub fn new(root: impl Into<PathBuf>) -> DirectoryContainer {
        let root = root.into();
        let location = root.display().to_string();

        DirectoryContainer { root, location }
    }

    /// Resolve a relative entry path against the root, rejecting traversal.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        if path.is_empty() {
            return None;
        }

        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => return None,
            }
        }

        Some(self.root.join(relative))
    }
}

impl ContentContainer for DirectoryContainer {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Directory
    }

    fn entry(&self, path: &str) -> Result<Option<ContainerEntry>> {
        let Some(full) = self.resolve(path) else {
            return Ok(None);
        };

        if !full.is_file() {
            return Ok(None);
        }

        match fs::read(&full) {
            Ok(data) => Ok(Some(ContainerEntry::fresh(data))),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(crate::Error::FileError(error)),
        }
    }

    fn locations(&self) -> Vec<String> {
        vec![self.location.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("classgate_dircontainer_{name}"));
        fs::create_dir_all(root.join("com/example")).unwrap();
        root
    }

    #[test]
    fn reads_entries_from_disk() {
        let root = scratch_root("reads");
        fs::write(root.join("com/example/Widget.class"), [0xCA, 0xFE]).unwrap();

        let container = DirectoryContainer::new(&root);
        let entry = container.entry("com/example/Widget.class").unwrap().unwrap();
        assert_eq!(entry.data, vec![0xCA, 0xFE]);
        assert!(!entry.cached);

        assert!(container.entry("com/example/Missing.class").unwrap().is_none());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn directories_are_not_entries() {
        let root = scratch_root("dirs");

        let container = DirectoryContainer::new(&root);
        assert!(container.entry("com/example").unwrap().is_none());
        assert!(container.entry("com").unwrap().is_none());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn traversal_is_rejected() {
        let root = scratch_root("traversal");
        fs::write(root.join("com/example/Inside.class"), [1]).unwrap();

        let container = DirectoryContainer::new(root.join("com"));
        assert!(container.entry("example/Inside.class").unwrap().is_some());
        assert!(container.entry("../com/example/Inside.class").unwrap().is_none());
        assert!(container.entry("example/../example/Inside.class").unwrap().is_none());
        assert!(container.entry("/etc/hostname").unwrap().is_none());
        assert!(container.entry("").unwrap().is_none());

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn missing_root_finds_nothing() {
        let container = DirectoryContainer::new("/nonexistent/classgate/root");
        assert!(container.entry("a/B.class").unwrap().is_none());
        assert_eq!(container.kind(), ContainerKind::Directory);
    }

    #[test]
    fn location_is_the_root_display() {
        let container = DirectoryContainer::new("/srv/app/classes");
        assert_eq!(container.locations(), vec!["/srv/app/classes".to_string()]);
        assert_eq!(container.physical_location(), "/srv/app/classes");
    }
}
