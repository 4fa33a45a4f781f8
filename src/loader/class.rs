//! Defined class records and class record validation.
//!
//! A successful load produces a [`crate::loader::LoadedClass`], the immutable record
//! of one defined class: its binary name, its defined bytes after transformation, the
//! identity of the loader that defined it, its package record and its protection
//! domain. Records are shared behind [`crate::loader::LoadedClassRc`], loaders hand
//! out the same instance for every request of the same name, which is what makes
//! repeated loads idempotent.
//!
//! Validation is deliberately shallow. A class record must be at least as long as
//! its fixed header and open with the class record magic, anything deeper is the
//! embedder's concern. Validation runs on the bytes that will actually be defined,
//! after the transformation pipeline, so a transformer that corrupts a record is
//! caught here.

use std::sync::Arc;

use crossbeam_skiplist::SkipMap;
use tracing::error;

use crate::{
    error::DIAG_MALFORMED_CLASS,
    loader::{ClassLoaderIdentity, PackageRc, ProtectionDomainRc},
    Result,
};

/// Magic number opening every valid class record.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// Fixed header length of a class record, magic plus version words.
pub(crate) const CLASS_HEADER_LEN: usize = 8;

/// A reference to a shared defined class.
pub type LoadedClassRc = Arc<LoadedClass>;

/// Defined class table of a loader, keyed by binary name.
///
/// The lock-free map carries the same-class guarantee: definition races go through
/// `get_or_insert`, so exactly one record per name survives and every racer receives
/// it.
pub(crate) type ClassMap = SkipMap<String, LoadedClassRc>;

/// The immutable record of one defined class.
///
/// # Examples
///
/// ```rust,ignore
/// let class = loader.load_class("com.example.Widget")?;
/// assert_eq!(class.name(), "com.example.Widget");
/// assert_eq!(class.defined_by().to_string(), "inventory:app");
/// assert_eq!(class.package().unwrap().name(), "com.example");
/// ```
#[derive(Debug)]
pub struct LoadedClass {
    /// Dot-separated binary name
    name: String,
    /// Defined bytes, after transformation
    bytes: Vec<u8>,
    /// Identity of the loader that defined this class
    defined_by: ClassLoaderIdentity,
    /// Package record, `None` for the default package
    package: Option<PackageRc>,
    /// Protection domain of this class
    protection_domain: ProtectionDomainRc,
}

impl LoadedClass {
    pub(crate) fn new(
        name: &str,
        bytes: Vec<u8>,
        defined_by: ClassLoaderIdentity,
        package: Option<PackageRc>,
        protection_domain: ProtectionDomainRc,
    ) -> LoadedClass {
        LoadedClass {
            name: name.to_string(),
            bytes,
            defined_by,
            package,
            protection_domain,
        }
    }

    /// Dot-separated binary name of this class.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bytes this class was defined from, after transformation.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Identity of the loader that defined this class.
    ///
    /// For classes resolved through delegation this names the loader that actually
    /// defined the class, not the loader the request entered through.
    pub fn defined_by(&self) -> &ClassLoaderIdentity {
        &self.defined_by
    }

    /// Package record of this class, `None` for the default package.
    pub fn package(&self) -> Option<&PackageRc> {
        self.package.as_ref()
    }

    /// Protection domain of this class.
    pub fn protection_domain(&self) -> &ProtectionDomainRc {
        &self.protection_domain
    }
}

/// Validate a class record before definition.
///
/// Runs on post-transformation bytes. Emits the malformed class diagnostic and
/// returns [`crate::Error::MalformedClass`] when the record is too short or does not
/// open with [`crate::loader::CLASS_MAGIC`].
pub(crate) fn verify_class_bytes(name: &str, bytes: &[u8]) -> Result<()> {
    if bytes.len() < CLASS_HEADER_LEN {
        error!(
            "{DIAG_MALFORMED_CLASS}: class record for {name} is truncated at {} bytes",
            bytes.len()
        );
        return Err(malformed_class_error!(
            name,
            "Class record truncated at {} bytes",
            bytes.len()
        ));
    }

    let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != CLASS_MAGIC {
        error!("{DIAG_MALFORMED_CLASS}: class record for {name} has invalid magic 0x{magic:08X}");
        return Err(malformed_class_error!(
            name,
            "Invalid class record magic 0x{:08X}",
            magic
        ));
    }

    Ok(())
}

/// Map a binary class name to its class path entry.
///
/// `com.example.Widget` resolves under `com/example/Widget.class`.
pub(crate) fn resource_path(class_name: &str) -> String {
    format!("{}.class", class_name.replace('.', "/"))
}

/// The package of a binary class name, `None` for the default package.
pub(crate) fn package_of(class_name: &str) -> Option<&str> {
    match class_name.rsplit_once('.') {
        Some((package, _)) if !package.is_empty() => Some(package),
        _ => None,
    }
}

/// The directory a package's entries live under, with a trailing slash.
pub(crate) fn package_dir(package: &str) -> String {
    format!("{}/", package.replace('.', "/"))
}

/// The package a resource path belongs to, `None` for top level resources.
pub(crate) fn package_of_resource(path: &str) -> Option<String> {
    match path.rsplit_once('/') {
        Some((directory, _)) if !directory.is_empty() => Some(directory.replace('/', ".")),
        _ => None,
    }
}
