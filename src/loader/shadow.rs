//! Shadow class loaders for fresh class copies.
//!
//! A shadow loader mirrors an existing application loader, its surrogate. It
//! resolves with the surrogate's class path, delegation order, libraries and
//! transformation pipeline, but defines everything the surrogate would define
//! itself under its own shadow identity, into its own defined class table.
//! Loading a class through a shadow therefore never touches the surrogate's
//! table, which is what diagnostic and redefinition tooling needs: a current
//! copy of a class, re-read and re-transformed, without disturbing the classes
//! the application is running on.
//!
//! Classes the surrogate would not define itself keep their original owner. A
//! request the parent chain answers returns the parent chain's shared record,
//! and a library hit stays defined by the library's loader.
//!
//! Shadows are created through the owning service and are not registered, they
//! live as long as the caller holds them.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    container::Resource,
    loader::{
        class::{package_of, verify_class_bytes, ClassMap},
        package::{define_package, Package, PackageMap},
        security::{domain_for, DomainMap},
        AppClassLoader, ByteResourceInformation, ClassLoader, ClassLoaderIdentity,
        DelegationOrder, LoadedClass, LoadedClassRc, LoaderRef,
    },
    Error, Result,
};

/// A loader shadowing an application loader with its own definitions.
///
/// # Examples
///
/// ```rust,ignore
/// let shadow = service.create_shadow_class_loader(loader.identity())?;
///
/// let running = loader.load_class("com.example.Widget")?;
/// let fresh = shadow.load_class("com.example.Widget")?;
///
/// assert!(!Arc::ptr_eq(&running, &fresh));
/// assert_eq!(fresh.defined_by().to_string(), "inventory:app-shadow");
/// ```
pub struct ShadowClassLoader {
    /// Surrogate identity with the shadow marker appended
    id: ClassLoaderIdentity,
    /// The application loader being shadowed
    surrogate: Arc<AppClassLoader>,
    /// Classes defined by this shadow
    classes: ClassMap,
    /// Packages defined by this shadow
    packages: PackageMap,
    /// Protection domains interned per code source
    domains: DomainMap,
}

impl fmt::Debug for ShadowClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowClassLoader")
            .field("id", &self.id)
            .field("surrogate", &self.surrogate.identity())
            .finish_non_exhaustive()
    }
}

impl ShadowClassLoader {
    pub(crate) fn new(surrogate: Arc<AppClassLoader>) -> ShadowClassLoader {
        ShadowClassLoader {
            id: surrogate.identity().shadow(),
            surrogate,
            classes: ClassMap::new(),
            packages: PackageMap::new(),
            domains: DomainMap::new(),
        }
    }

    /// The application loader this shadow mirrors.
    pub fn surrogate(&self) -> &Arc<AppClassLoader> {
        &self.surrogate
    }

    /// The surrogate's local step, with definitions landing in the shadow.
    fn load_locally(&self, name: &str) -> Result<LoadedClassRc> {
        if let Some(info) = self.surrogate.find_class_bytes(name)? {
            return self.define_shadow_class(name, &info);
        }

        if let Some(class) = self.surrogate.load_from_libraries(name)? {
            return Ok(class);
        }

        if let Some(bytes) = self.surrogate.generate_for(name, self)? {
            return self.define_generated_class(name, bytes);
        }

        Err(Error::NotFound {
            class: name.to_string(),
        })
    }

    fn define_shadow_class(&self, name: &str, info: &ByteResourceInformation) -> Result<LoadedClassRc> {
        let bytes = self.surrogate.pipeline().transform(name, info)?;
        verify_class_bytes(name, &bytes)?;

        let package = define_package(&self.packages, name, info.container());
        let domain = domain_for(
            &self.domains,
            &info.code_source_location(),
            self.surrogate.domain_template(),
        );

        debug!("{}: shadow defining {name} from {}", self.id, info.code_source_location());
        let class = Arc::new(LoadedClass::new(name, bytes, self.id.clone(), package, domain));

        Ok(self
            .classes
            .get_or_insert(name.to_string(), class)
            .value()
            .clone())
    }

    fn define_generated_class(&self, name: &str, bytes: Vec<u8>) -> Result<LoadedClassRc> {
        verify_class_bytes(name, &bytes)?;

        let package = package_of(name).map(|package| {
            self.packages
                .entry(package.to_string())
                .or_insert_with(|| Arc::new(Package::unattributed(package)))
                .value()
                .clone()
        });
        let domain = domain_for(
            &self.domains,
            &format!("generated:{}", self.id),
            self.surrogate.domain_template(),
        );

        let class = Arc::new(LoadedClass::new(name, bytes, self.id.clone(), package, domain));

        Ok(self
            .classes
            .get_or_insert(name.to_string(), class)
            .value()
            .clone())
    }
}

impl ClassLoader for ShadowClassLoader {
    fn identity(&self) -> &ClassLoaderIdentity {
        &self.id
    }

    fn load_class(&self, name: &str) -> Result<LoadedClassRc> {
        if let Some(existing) = self.classes.get(name) {
            return Ok(existing.value().clone());
        }

        let parent = self.surrogate.parent();

        match (self.surrogate.delegation(), parent) {
            (DelegationOrder::ParentFirst, Some(parent)) => match parent.load_class(name) {
                Ok(class) => Ok(class),
                Err(Error::NotFound { .. }) => self.load_locally(name),
                Err(error) => Err(error),
            },
            (DelegationOrder::ParentLast, Some(parent)) => match self.load_locally(name) {
                Ok(class) => Ok(class),
                Err(Error::NotFound { .. }) => parent.load_class(name),
                Err(error) => Err(error),
            },
            (_, None) => self.load_locally(name),
        }
    }

    fn resource(&self, path: &str) -> Option<Resource> {
        self.surrogate.resource(path)
    }

    fn parent(&self) -> Option<LoaderRef> {
        self.surrogate.parent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        container::{ContainerRef, MemoryContainer},
        library::{LibraryActivation, LibraryResolver},
        loader::{ClassLoaderConfiguration, GeneratorRegistry, SystemClassLoader},
        service::GlobalConfig,
        test::{class_bytes, class_payload, AppendTransformer, StaticLibraryProvider},
        transform::TransformerList,
    };

    fn container_with(location: &str, entries: &[(&str, &str)]) -> ContainerRef {
        let container = Arc::new(MemoryContainer::archive(location));
        for (class, payload) in entries {
            container.add_class(class, class_bytes(payload));
        }
        container
    }

    fn surrogate_over(
        entries: &[(&str, &str)],
        parent_entries: &[(&str, &str)],
        provider: Arc<StaticLibraryProvider>,
    ) -> Arc<AppClassLoader> {
        let parent: LoaderRef = Arc::new(SystemClassLoader::new(vec![container_with(
            "memory:/parent.jar",
            parent_entries,
        )]));

        AppClassLoader::new(
            &ClassLoaderConfiguration::new(ClassLoaderIdentity::new("inventory", "app"))
                .with_container(container_with("memory:/app.jar", entries))
                .with_common_library("util"),
            parent,
            Arc::new(LibraryResolver::new(provider)),
            Arc::new(TransformerList::new()),
            Arc::new(GeneratorRegistry::new()),
            Arc::new(GlobalConfig::new()),
        )
    }

    #[test]
    fn shadow_defines_fresh_records() {
        let surrogate = surrogate_over(
            &[("com.example.Widget", "v1")],
            &[],
            Arc::new(StaticLibraryProvider::new()),
        );
        let shadow = ShadowClassLoader::new(surrogate.clone());

        let running = surrogate.load_class("com.example.Widget").unwrap();
        let fresh = shadow.load_class("com.example.Widget").unwrap();

        assert!(!Arc::ptr_eq(&running, &fresh));
        assert_eq!(class_payload(&fresh), class_payload(&running));
        assert_eq!(running.defined_by().to_string(), "inventory:app");
        assert_eq!(fresh.defined_by().to_string(), "inventory:app-shadow");

        // The shadow leaves the surrogate's table untouched.
        assert!(surrogate.loaded_class("com.example.Widget").is_some());
        assert!(Arc::ptr_eq(
            &surrogate.load_class("com.example.Widget").unwrap(),
            &running
        ));
    }

    #[test]
    fn shadow_repeats_return_the_shadow_record() {
        let surrogate = surrogate_over(
            &[("com.example.Widget", "v1")],
            &[],
            Arc::new(StaticLibraryProvider::new()),
        );
        let shadow = ShadowClassLoader::new(surrogate);

        let first = shadow.load_class("com.example.Widget").unwrap();
        let second = shadow.load_class("com.example.Widget").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn ancestor_classes_stay_shared() {
        let surrogate = surrogate_over(
            &[],
            &[("platform.Clock", "platform")],
            Arc::new(StaticLibraryProvider::new()),
        );
        let shadow = ShadowClassLoader::new(surrogate.clone());

        let through_surrogate = surrogate.load_class("platform.Clock").unwrap();
        let through_shadow = shadow.load_class("platform.Clock").unwrap();

        assert!(Arc::ptr_eq(&through_surrogate, &through_shadow));
        assert_eq!(through_shadow.defined_by().to_string(), "platform:system");
    }

    #[test]
    fn shadow_sees_surrogate_transformers() {
        let surrogate = surrogate_over(
            &[("com.example.Widget", "plain")],
            &[],
            Arc::new(StaticLibraryProvider::new()),
        );
        surrogate.add_transformer(Arc::new(AppendTransformer::new(b"-stamped")));

        let shadow = ShadowClassLoader::new(surrogate);
        let fresh = shadow.load_class("com.example.Widget").unwrap();
        assert_eq!(class_payload(&fresh), "plain-stamped");
    }

    #[test]
    fn library_classes_keep_their_owner_through_the_shadow() {
        let library_loader = AppClassLoader::new(
            &ClassLoaderConfiguration::new(ClassLoaderIdentity::new("shared", "util"))
                .with_container(container_with("memory:/util.jar", &[("util.Strings", "util")])),
            Arc::new(SystemClassLoader::new(Vec::new())),
            Arc::new(LibraryResolver::new(Arc::new(StaticLibraryProvider::new()))),
            Arc::new(TransformerList::new()),
            Arc::new(GeneratorRegistry::new()),
            Arc::new(GlobalConfig::new()),
        );

        let provider = Arc::new(StaticLibraryProvider::new());
        provider.define("util", library_loader, LibraryActivation::Synchronous);

        let surrogate = surrogate_over(&[], &[], provider);
        let shadow = ShadowClassLoader::new(surrogate);

        let class = shadow.load_class("util.Strings").unwrap();
        assert_eq!(class.defined_by().to_string(), "shared:util");
    }

    #[test]
    fn shadow_identity_carries_the_marker() {
        let surrogate = surrogate_over(&[], &[], Arc::new(StaticLibraryProvider::new()));
        let shadow = ShadowClassLoader::new(surrogate);

        assert_eq!(shadow.identity().to_string(), "inventory:app-shadow");
        assert_eq!(
            shadow.parent().unwrap().identity().to_string(),
            "platform:system"
        );
    }
}
