//! Byte resource information flowing through the transformation pipeline.
//!
//! When a loader finds a class record on its class path, it wraps the bytes together
//! with their provenance in a [`crate::loader::ByteResourceInformation`] before
//! handing them to the transformation pipeline. Transformers receive this record for
//! every invocation: it tells them whether the bytes came from a pre-processed cache
//! and lets them re-read the untransformed bytes from the supplying container when
//! they need to diff against the original.

use std::fmt;

use crate::{container::ContainerRef, Result};

/// The bytes of a found class record plus where they came from.
///
/// The embedded bytes are the starting input of the transformation pipeline. The
/// original bytes are not retained separately, transformers that need them re-read
/// the supplying container on demand.
pub struct ByteResourceInformation {
    /// Bytes as read from the class path
    bytes: Vec<u8>,
    /// Container entry path the bytes were read from
    resource_path: String,
    /// Container that supplied the bytes
    container: ContainerRef,
    /// Whether the bytes were served from a pre-processed cache
    from_cache: bool,
}

impl ByteResourceInformation {
    pub(crate) fn new(
        bytes: Vec<u8>,
        resource_path: String,
        container: ContainerRef,
        from_cache: bool,
    ) -> ByteResourceInformation {
        ByteResourceInformation {
            bytes,
            resource_path,
            container,
            from_cache,
        }
    }

    /// Bytes as read from the class path.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Container entry path the bytes were read from.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Container that supplied the bytes.
    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    /// Whether the bytes were served from a pre-processed cache.
    ///
    /// System transformers do not run on cached bytes, their output is already baked
    /// in, unless the beta edition override forces them to.
    pub fn from_cache(&self) -> bool {
        self.from_cache
    }

    /// Re-read the untransformed bytes from the supplying container.
    ///
    /// This is a live read, it reflects the container's current content rather than
    /// a snapshot taken at load time.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the container fails to read, and
    /// [`crate::Error::Error`] if the entry has disappeared since the load began.
    pub fn original_bytes(&self) -> Result<Vec<u8>> {
        match self.container.entry(&self.resource_path)? {
            Some(entry) => Ok(entry.data),
            None => Err(crate::Error::Error(format!(
                "Resource {} is no longer present in {}",
                self.resource_path,
                self.container.physical_location()
            ))),
        }
    }

    /// Physical location of the supplying container.
    ///
    /// This is the code source location the class will be defined under.
    pub fn code_source_location(&self) -> String {
        self.container.physical_location()
    }
}

impl fmt::Debug for ByteResourceInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteResourceInformation")
            .field("resource_path", &self.resource_path)
            .field("bytes", &self.bytes.len())
            .field("from_cache", &self.from_cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use std::sync::Arc;

    fn info_over(container: &Arc<MemoryContainer>, path: &str, bytes: Vec<u8>) -> ByteResourceInformation {
        ByteResourceInformation::new(
            bytes,
            path.to_string(),
            container.clone() as ContainerRef,
            false,
        )
    }

    #[test]
    fn exposes_bytes_and_provenance() {
        let container = Arc::new(MemoryContainer::archive("memory:/app.jar"));
        container.add_entry("a/B.class", vec![1, 2, 3]);

        let info = info_over(&container, "a/B.class", vec![1, 2, 3]);
        assert_eq!(info.bytes(), &[1, 2, 3]);
        assert_eq!(info.resource_path(), "a/B.class");
        assert_eq!(info.code_source_location(), "memory:/app.jar");
        assert!(!info.from_cache());
    }

    #[test]
    fn original_bytes_are_read_live() {
        let container = Arc::new(MemoryContainer::archive("memory:/app.jar"));
        container.add_entry("a/B.class", vec![1, 2, 3]);

        let info = info_over(&container, "a/B.class", vec![9, 9, 9]);

        // The supplier, not the embedded bytes, answers original_bytes.
        assert_eq!(info.original_bytes().unwrap(), vec![1, 2, 3]);

        container.add_entry("a/B.class", vec![4, 5]);
        assert_eq!(info.original_bytes().unwrap(), vec![4, 5]);
    }

    #[test]
    fn vanished_entries_fail_the_read() {
        let container = Arc::new(MemoryContainer::archive("memory:/app.jar"));
        container.add_entry("a/B.class", vec![1]);

        let info = info_over(&container, "a/B.class", vec![1]);
        container.remove_entry("a/B.class");

        assert!(matches!(
            info.original_bytes().unwrap_err(),
            crate::Error::Error(_)
        ));
    }
}
