//! Package records attributed from archive manifests.
//!
//! The first class defined for a package creates that package's record in the
//! defining loader. When the supplying container is an archive with a manifest, the
//! record carries the specification and implementation attributes the manifest
//! declares for the package directory, and the package can be sealed to the archive.
//! Classes served from directories produce plain records with no attributes, sealing
//! does not apply to exploded class paths.
//!
//! Package records are metadata. Sealing is recorded and exposed for the embedder,
//! this crate does not reject later classes of a sealed package itself.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    container::{ContainerKind, ContainerRef, PackageAttributes},
    loader::class::{package_dir, package_of},
};

/// A reference to a shared package record.
pub type PackageRc = Arc<Package>;

/// Package table of a loader, keyed by dot-separated package name.
pub(crate) type PackageMap = DashMap<String, PackageRc>;

/// The package record of a defining loader.
///
/// Created once per package per loader, the first definition wins and later classes
/// of the same package attach to the existing record, whichever container they came
/// from.
///
/// # Examples
///
/// ```rust
/// use classgate::container::{ContentContainer, Manifest, MemoryContainer};
/// # use std::sync::Arc;
/// # use classgate::container::ContainerRef;
///
/// let manifest = Manifest::parse(
///     b"Sealed: true\nImplementation-Version: 2.1\n",
/// )?;
/// let container: ContainerRef = Arc::new(
///     MemoryContainer::archive("memory:/util.jar").with_manifest(manifest),
/// );
///
/// // Loaders create the records, the manifest decides their content.
/// assert!(container.manifest().unwrap().package_attributes("com/example/").sealed);
/// # Ok::<(), classgate::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    /// Dot-separated package name
    name: String,
    /// Value of the `Specification-Title` attribute
    spec_title: Option<String>,
    /// Value of the `Specification-Version` attribute
    spec_version: Option<String>,
    /// Value of the `Specification-Vendor` attribute
    spec_vendor: Option<String>,
    /// Value of the `Implementation-Title` attribute
    impl_title: Option<String>,
    /// Value of the `Implementation-Version` attribute
    impl_version: Option<String>,
    /// Value of the `Implementation-Vendor` attribute
    impl_vendor: Option<String>,
    /// Whether the package is sealed to its supplying archive
    sealed: bool,
    /// Physical location the package is sealed to
    seal_base: Option<String>,
}

impl Package {
    /// Build a record from manifest attributes.
    pub(crate) fn from_attributes(
        name: &str,
        attributes: PackageAttributes,
        location: &str,
    ) -> Package {
        let sealed = attributes.sealed;

        Package {
            name: name.to_string(),
            spec_title: attributes.spec_title,
            spec_version: attributes.spec_version,
            spec_vendor: attributes.spec_vendor,
            impl_title: attributes.impl_title,
            impl_version: attributes.impl_version,
            impl_vendor: attributes.impl_vendor,
            sealed,
            seal_base: sealed.then(|| location.to_string()),
        }
    }

    /// Build a record with no attributes, for directory and generated content.
    pub(crate) fn unattributed(name: &str) -> Package {
        Package {
            name: name.to_string(),
            spec_title: None,
            spec_version: None,
            spec_vendor: None,
            impl_title: None,
            impl_version: None,
            impl_vendor: None,
            sealed: false,
            seal_base: None,
        }
    }

    /// Dot-separated package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the `Specification-Title` attribute.
    pub fn spec_title(&self) -> Option<&str> {
        self.spec_title.as_deref()
    }

    /// Value of the `Specification-Version` attribute.
    pub fn spec_version(&self) -> Option<&str> {
        self.spec_version.as_deref()
    }

    /// Value of the `Specification-Vendor` attribute.
    pub fn spec_vendor(&self) -> Option<&str> {
        self.spec_vendor.as_deref()
    }

    /// Value of the `Implementation-Title` attribute.
    pub fn impl_title(&self) -> Option<&str> {
        self.impl_title.as_deref()
    }

    /// Value of the `Implementation-Version` attribute.
    pub fn impl_version(&self) -> Option<&str> {
        self.impl_version.as_deref()
    }

    /// Value of the `Implementation-Vendor` attribute.
    pub fn impl_vendor(&self) -> Option<&str> {
        self.impl_vendor.as_deref()
    }

    /// Whether the package is sealed to its supplying archive.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Physical location the package is sealed to, when sealed.
    pub fn seal_base(&self) -> Option<&str> {
        self.seal_base.as_deref()
    }
}

/// Look up or create the package record for a class being defined.
///
/// Returns `None` for classes in the default package. Creation is atomic, under
/// concurrent definition of a package's first classes exactly one record survives
/// and every definer receives it.
pub(crate) fn define_package(
    map: &PackageMap,
    class_name: &str,
    container: &ContainerRef,
) -> Option<PackageRc> {
    let name = package_of(class_name)?;

    if let Some(existing) = map.get(name) {
        return Some(existing.value().clone());
    }

    let package = match (container.kind(), container.manifest()) {
        (ContainerKind::Archive, Some(manifest)) => Package::from_attributes(
            name,
            manifest.package_attributes(&package_dir(name)),
            &container.physical_location(),
        ),
        _ => Package::unattributed(name),
    };

    Some(
        map.entry(name.to_string())
            .or_insert_with(|| Arc::new(package))
            .value()
            .clone(),
    )
}
