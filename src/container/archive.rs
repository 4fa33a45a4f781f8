//! Archive container backend for memory-mapped class path archives.
//!
//! This module provides the [`crate::container::ArchiveContainer`] backend that
//! implements [`crate::container::ContentContainer`] for packaged archives. The
//! archive is indexed once at construction by walking its central directory, after
//! that every entry lookup is a table hit plus one bounds-checked slice of the
//! underlying data.
//!
//! # Architecture
//!
//! Archives are accessed through memory-mapped I/O when opened from disk, so a large
//! class path archive never needs to be read fully into memory. The same indexing
//! code runs over plain byte buffers for archives that arrive in memory. Only stored
//! entries are supported: class path archives written for cache-friendly loading do
//! not compress their entries, and rejecting compressed entries keeps the read path
//! allocation-free up to the final copy handed to the loader.
//!
//! Indexing is strict. A missing end of central directory record, a truncated
//! central directory, entry ranges outside the archive or a compressed entry all
//! fail construction with [`crate::Error::Malformed`] or
//! [`crate::Error::OutOfBounds`] rather than producing a partial index.
//!
//! # Key Components
//!
//! - [`crate::container::ArchiveContainer`] - The backend struct
//! - [`crate::container::ArchiveContainer::open`] - Index an archive from disk via
//!   memory mapping
//! - [`crate::container::ArchiveContainer::from_bytes`] - Index an archive already
//!   held in memory
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use classgate::container::{ArchiveContainer, ContentContainer};
//!
//! let archive = ArchiveContainer::open("apps/service/lib/service.jar")?;
//! if let Some(entry) = archive.entry("com/example/Widget.class")? {
//!     println!("stored record is {} bytes", entry.data.len());
//! }
//!
//! // Archives expose their manifest for package attribution.
//! if let Some(manifest) = archive.manifest() {
//!     println!("sealed: {}", manifest.package_attributes("com/example/").sealed);
//! }
//! # Ok::<(), classgate::Error>(())
//! ```

use std::{collections::HashMap, fs, path::Path};

use memmap2::Mmap;

use crate::{
    container::{ContainerEntry, ContainerKind, ContentContainer, Manifest},
    Error::{Error, FileError},
    Result,
};

/// Path of the manifest entry inside an archive.
const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Signature of the end of central directory record.
const END_SIGNATURE: u32 = 0x0605_4B50;
/// Signature of a central directory file header.
const CENTRAL_SIGNATURE: u32 = 0x0201_4B50;
/// Signature of a local file header.
const LOCAL_SIGNATURE: u32 = 0x0403_4B50;

/// Fixed length of the end of central directory record.
const END_FIXED_LEN: usize = 22;
/// Fixed length of a central directory file header.
const CENTRAL_FIXED_LEN: usize = 46;
/// Fixed length of a local file header.
const LOCAL_FIXED_LEN: usize = 30;

/// Compression method for entries stored without compression.
const METHOD_STORED: u16 = 0;
/// Longest possible archive comment, bounds the end record search.
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

/// Backing storage of an archive, either memory-mapped or owned.
#[derive(Debug)]
enum ArchiveData {
    /// Archive mapped from a file on disk
    Mapped(Mmap),
    /// Archive held in an owned buffer
    Buffer(Vec<u8>),
}

impl ArchiveData {
    fn data(&self) -> &[u8] {
        match self {
            ArchiveData::Mapped(mmap) => mmap.as_ref(),
            ArchiveData::Buffer(buffer) => buffer.as_slice(),
        }
    }
}

/// Location of one stored entry inside the archive data.
#[derive(Debug, Clone, Copy)]
struct EntryIndex {
    /// Offset of the first data byte
    offset: usize,
    /// Stored length in bytes
    size: usize,
}

/// A container backed by a stored-entry archive.
///
/// The entry index and manifest are built eagerly by
/// [`crate::container::ArchiveContainer::open`] and
/// [`crate::container::ArchiveContainer::from_bytes`], lookups afterwards cannot
/// fail structurally. Directory markers inside the archive are not indexed, only
/// file entries resolve.
///
/// # Examples
///
/// ```rust,ignore
/// use classgate::container::{ArchiveContainer, ContentContainer};
///
/// let archive = ArchiveContainer::from_bytes(jar_bytes, "memory:/app.jar")?;
/// assert!(archive.entry("com/example/Widget.class")?.is_some());
/// assert_eq!(archive.physical_location(), "memory:/app.jar");
/// # Ok::<(), classgate::Error>(())
/// ```
#[derive(Debug)]
pub struct ArchiveContainer {
    /// Raw archive bytes
    source: ArchiveData,
    /// Physical location reported for this archive
    location: String,
    /// Entry table, keyed by relative path
    entries: HashMap<String, EntryIndex>,
    /// Parsed manifest, when the archive carries one
    manifest: Option<Manifest>,
}

impl ArchiveContainer {
    /// Index an archive file from disk using memory-mapped I/O.
    ///
    /// The mapping is read-only and shared, several processes can serve the same
    /// archive without duplicating it in memory.
    ///
    /// # Arguments
    /// * `path` - Path to the archive on disk. Accepts `&Path`, `&str`, `String`, or `PathBuf`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened,
    /// [`crate::Error::Error`] if memory mapping fails, and
    /// [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the archive
    /// structure does not survive indexing.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use classgate::container::ArchiveContainer;
    ///
    /// let archive = ArchiveContainer::open("apps/service/lib/service.jar")?;
    /// assert!(!archive.is_empty());
    /// # Ok::<(), classgate::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<ArchiveContainer> {
        let path = path.as_ref();
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(Error(error.to_string())),
        };

        ArchiveContainer::build(ArchiveData::Mapped(mmap), path.display().to_string())
    }

    /// Index an archive already held in memory.
    ///
    /// # Arguments
    /// * `data` - Complete archive bytes
    /// * `location` - Physical location to report for this archive
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if the
    /// archive structure does not survive indexing.
    pub fn from_bytes(data: Vec<u8>, location: impl Into<String>) -> Result<ArchiveContainer> {
        ArchiveContainer::build(ArchiveData::Buffer(data), location.into())
    }

    fn build(source: ArchiveData, location: String) -> Result<ArchiveContainer> {
        let entries = ArchiveContainer::index(source.data())?;

        let manifest = match entries.get(MANIFEST_PATH) {
            Some(index) => {
                let bytes = ArchiveContainer::slice(source.data(), index.offset, index.size)?;
                Some(Manifest::parse(bytes)?)
            }
            None => None,
        };

        Ok(ArchiveContainer {
            source,
            location,
            entries,
            manifest,
        })
    }

    /// Walk the central directory and build the entry table.
    fn index(data: &[u8]) -> Result<HashMap<String, EntryIndex>> {
        let end_offset = ArchiveContainer::find_end_record(data)?;
        let total = ArchiveContainer::read_u16(data, end_offset + 10)? as usize;
        let directory_offset = ArchiveContainer::read_u32(data, end_offset + 16)? as usize;

        let mut entries = HashMap::with_capacity(total);
        let mut cursor = directory_offset;

        for _ in 0..total {
            if ArchiveContainer::read_u32(data, cursor)? != CENTRAL_SIGNATURE {
                return Err(malformed_error!(
                    "Central directory record at offset {} has an invalid signature",
                    cursor
                ));
            }

            let method = ArchiveContainer::read_u16(data, cursor + 10)?;
            let compressed = ArchiveContainer::read_u32(data, cursor + 20)? as usize;
            let uncompressed = ArchiveContainer::read_u32(data, cursor + 24)? as usize;
            let name_len = ArchiveContainer::read_u16(data, cursor + 28)? as usize;
            let extra_len = ArchiveContainer::read_u16(data, cursor + 30)? as usize;
            let comment_len = ArchiveContainer::read_u16(data, cursor + 32)? as usize;
            let local_offset = ArchiveContainer::read_u32(data, cursor + 42)? as usize;

            let name_bytes = ArchiveContainer::slice(data, cursor + CENTRAL_FIXED_LEN, name_len)?;
            let Ok(name) = std::str::from_utf8(name_bytes) else {
                return Err(malformed_error!(
                    "Archive entry name at offset {} is not valid UTF-8",
                    cursor
                ));
            };

            let advance = CENTRAL_FIXED_LEN + name_len + extra_len + comment_len;
            cursor = match cursor.checked_add(advance) {
                Some(next) => next,
                None => return Err(out_of_bounds_error!()),
            };

            // Directory markers carry no bytes
            if name.ends_with('/') {
                continue;
            }

            if method != METHOD_STORED {
                return Err(malformed_error!(
                    "Archive entry '{}' uses unsupported compression method {}",
                    name,
                    method
                ));
            }

            if compressed != uncompressed {
                return Err(malformed_error!(
                    "Archive entry '{}' is stored but its sizes disagree - {} != {}",
                    name,
                    compressed,
                    uncompressed
                ));
            }

            let data_offset = ArchiveContainer::entry_data_offset(data, local_offset)?;
            ArchiveContainer::slice(data, data_offset, compressed)?;

            entries.insert(
                name.to_string(),
                EntryIndex {
                    offset: data_offset,
                    size: compressed,
                },
            );
        }

        Ok(entries)
    }

    /// Resolve where the stored bytes of a local entry begin.
    fn entry_data_offset(data: &[u8], local_offset: usize) -> Result<usize> {
        if ArchiveContainer::read_u32(data, local_offset)? != LOCAL_SIGNATURE {
            return Err(malformed_error!(
                "Local header at offset {} has an invalid signature",
                local_offset
            ));
        }

        let name_len = ArchiveContainer::read_u16(data, local_offset + 26)? as usize;
        let extra_len = ArchiveContainer::read_u16(data, local_offset + 28)? as usize;

        match local_offset.checked_add(LOCAL_FIXED_LEN + name_len + extra_len) {
            Some(offset) => Ok(offset),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Locate the end of central directory record.
    ///
    /// The record sits at the very end of the archive, preceded only by its own
    /// comment, so the search walks backwards over at most one comment's worth of
    /// bytes and requires the comment length to agree with the skipped tail.
    fn find_end_record(data: &[u8]) -> Result<usize> {
        if data.len() < END_FIXED_LEN {
            return Err(malformed_error!(
                "Archive of {} bytes is too small for an end of central directory record",
                data.len()
            ));
        }

        let lower = data.len().saturating_sub(END_FIXED_LEN + MAX_COMMENT_LEN);
        let mut offset = data.len() - END_FIXED_LEN;

        loop {
            if ArchiveContainer::read_u32(data, offset)? == END_SIGNATURE {
                let comment_len = ArchiveContainer::read_u16(data, offset + 20)? as usize;
                if offset + END_FIXED_LEN + comment_len == data.len() {
                    return Ok(offset);
                }
            }

            if offset == lower {
                break;
            }
            offset -= 1;
        }

        Err(malformed_error!(
            "Archive has no end of central directory record"
        ))
    }

    fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
        let Some(end) = offset.checked_add(2) else {
            return Err(out_of_bounds_error!());
        };

        match data.get(offset..end) {
            Some(bytes) => Ok(u16::from_le_bytes([bytes[0], bytes[1]])),
            None => Err(out_of_bounds_error!()),
        }
    }

    fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
        let Some(end) = offset.checked_add(4) else {
            return Err(out_of_bounds_error!());
        };

        match data.get(offset..end) {
            Some(bytes) => Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            None => Err(out_of_bounds_error!()),
        }
    }

    fn slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
        let Some(end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        match data.get(offset..end) {
            Some(bytes) => Ok(bytes),
            None => Err(out_of_bounds_error!()),
        }
    }

    /// Relative paths of all file entries in this archive.
    pub fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of file entries in this archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive holds no file entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContentContainer for ArchiveContainer {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Archive
    }

    fn entry(&self, path: &str) -> Result<Option<ContainerEntry>> {
        match self.entries.get(path) {
            Some(index) => {
                let bytes =
                    ArchiveContainer::slice(self.source.data(), index.offset, index.size)?;
                Ok(Some(ContainerEntry::fresh(bytes.to_vec())))
            }
            None => Ok(None),
        }
    }

    fn locations(&self) -> Vec<String> {
        vec![self.location.clone()]
    }

    fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }
}
