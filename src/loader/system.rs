//! The system class loader serving platform classes.
//!
//! The system loader sits at the root of every delegation chain. It resolves
//! against the platform's own class path and defines everything it finds under the
//! fixed `platform:system` identity. Transformation does not apply here, the
//! pipeline belongs to application loaders, but validation, package attribution and
//! protection domains work exactly as they do for application classes.

use std::sync::Arc;

use tracing::debug;

use crate::{
    container::{ContainerRef, Resource},
    loader::{
        class::{resource_path, verify_class_bytes, ClassMap},
        package::{define_package, PackageMap},
        security::{domain_for, DomainMap},
        ClassLoader, ClassLoaderIdentity, LoadedClass, LoadedClassRc,
    },
    Error, Result,
};

/// The loader serving the platform's own class path.
///
/// One system loader typically backs all gateways of an owning service. It is the
/// end of every delegation chain, a miss here is the miss the application finally
/// observes when nothing else supplied the class.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use classgate::{
///     container::{ContainerRef, MemoryContainer},
///     loader::{ClassLoader, SystemClassLoader},
/// };
///
/// let platform = Arc::new(MemoryContainer::archive("memory:/platform.jar"));
/// platform.add_class("platform.Runtime", vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52]);
///
/// let system = SystemClassLoader::new(vec![platform as ContainerRef]);
/// let class = system.load_class("platform.Runtime")?;
/// assert_eq!(class.defined_by().to_string(), "platform:system");
/// # Ok::<(), classgate::Error>(())
/// ```
pub struct SystemClassLoader {
    /// Fixed `platform:system` identity
    id: ClassLoaderIdentity,
    /// Ordered platform class path
    containers: Vec<ContainerRef>,
    /// Classes defined by this loader
    classes: ClassMap,
    /// Packages defined by this loader
    packages: PackageMap,
    /// Protection domains interned per code source
    domains: DomainMap,
}

impl SystemClassLoader {
    /// Create a system loader over the platform class path.
    ///
    /// # Arguments
    /// * `containers` - Ordered containers to resolve platform classes against
    pub fn new(containers: Vec<ContainerRef>) -> SystemClassLoader {
        SystemClassLoader {
            id: ClassLoaderIdentity::new("platform", "system"),
            containers,
            classes: ClassMap::new(),
            packages: PackageMap::new(),
            domains: DomainMap::new(),
        }
    }

    /// The package record this loader defined under a name, if any.
    pub fn package(&self, name: &str) -> Option<crate::loader::PackageRc> {
        self.packages.get(name).map(|entry| entry.value().clone())
    }

    fn define(&self, name: &str, bytes: Vec<u8>, container: &ContainerRef) -> Result<LoadedClassRc> {
        verify_class_bytes(name, &bytes)?;

        let package = define_package(&self.packages, name, container);
        let domain = domain_for(&self.domains, &container.physical_location(), None);
        let class = Arc::new(LoadedClass::new(name, bytes, self.id.clone(), package, domain));

        Ok(self
            .classes
            .get_or_insert(name.to_string(), class)
            .value()
            .clone())
    }
}

impl ClassLoader for SystemClassLoader {
    fn identity(&self) -> &ClassLoaderIdentity {
        &self.id
    }

    fn load_class(&self, name: &str) -> Result<LoadedClassRc> {
        if let Some(existing) = self.classes.get(name) {
            return Ok(existing.value().clone());
        }

        let path = resource_path(name);
        for container in &self.containers {
            if let Some(entry) = container.entry(&path)? {
                debug!(
                    "System loader defining {name} from {}",
                    container.physical_location()
                );
                return self.define(name, entry.data, container);
            }
        }

        Err(Error::NotFound {
            class: name.to_string(),
        })
    }

    fn resource(&self, path: &str) -> Option<Resource> {
        for container in &self.containers {
            match container.entry(path) {
                Ok(Some(entry)) => {
                    return Some(Resource {
                        data: entry.data,
                        location: container.entry_url(path),
                    })
                }
                Ok(None) => {}
                Err(error) => {
                    debug!(
                        "Container {} failed reading {path} - {error}",
                        container.physical_location()
                    );
                }
            }
        }

        None
    }
}
