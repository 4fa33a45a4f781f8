//! The application class loader.
//!
//! One application loader serves one class path: a top level loader serves the
//! application's own archives and delegates to its gateway, child loaders serve
//! nested scopes and delegate to their configured parent. The loader resolves in
//! a fixed shape, only the position of the parent moves:
//!
//! - **parent-first** consults the parent chain before the local class path, which
//!   is the default and matches what applications expect from the platform.
//! - **parent-last** consults the local class path before the parent chain, which
//!   lets an application override a platform library with its own version.
//!
//! The local step itself is ordered: the configured containers, then private
//! libraries, then common libraries, then registered class generators. Library
//! classes stay defined by the library's own loader, so two applications sharing
//! a common library agree on the identity of its classes. Everything the loader
//! defines itself passes through the transformation pipeline and record
//! validation before definition, and lands in the loader's defined class table
//! under the same-class guarantee.
//!
//! Loaders are constructed by the owning service, which wires in the shared
//! library resolver, the system transformer tier and the generator registry.

use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
    container::{ContainerRef, Resource},
    library::LibraryResolver,
    loader::{
        class::{package_of, resource_path, verify_class_bytes, ClassMap},
        generator::GeneratorRegistry,
        package::{define_package, Package, PackageMap},
        security::{domain_for, DomainMap},
        ByteResourceInformation, ClassLoader, ClassLoaderConfiguration, ClassLoaderIdentity,
        DelegationOrder, LoadedClass, LoadedClassRc, LoaderRef, PackageRc, Permissions,
    },
    service::GlobalConfig,
    transform::{ClassTransformer, TransformerList, TransformerPipeline},
    Error, Result,
};

/// A class loader serving one application scope.
///
/// Created through the owning service, never directly. The loader is immutable
/// apart from its defined class table and its loader-tier transformers, both of
/// which are safe under concurrent loads.
///
/// # Examples
///
/// ```rust,ignore
/// let loader = service.create_top_level_class_loader(None, gateway_config, config)?;
/// let class = loader.load_class("com.example.Widget")?;
/// assert_eq!(class.defined_by(), loader.identity());
/// ```
pub struct AppClassLoader {
    /// Identity this loader defines classes under
    id: ClassLoaderIdentity,
    /// Position of the parent in the resolution order
    delegation: DelegationOrder,
    /// Parent loader, a gateway for top level loaders
    parent: LoaderRef,
    /// Ordered local class path
    containers: Vec<ContainerRef>,
    /// Containers searched for native libraries
    native_containers: Vec<ContainerRef>,
    /// Library names resolved for this loader alone, searched before common ones
    private_libraries: Vec<String>,
    /// Library names shared with other loaders
    common_libraries: Vec<String>,
    /// Shared library resolver of the owning service
    libraries: Arc<LibraryResolver>,
    /// Two-tier transformation pipeline
    pipeline: TransformerPipeline,
    /// Generator registry of the owning service
    generators: Arc<GeneratorRegistry>,
    /// Whether generators may supply classes to this loader
    generated_classes: bool,
    /// Permissions granted to every domain this loader creates
    domain_template: Option<Permissions>,
    /// Classes defined by this loader
    classes: ClassMap,
    /// Packages defined by this loader
    packages: PackageMap,
    /// Protection domains interned per code source
    domains: DomainMap,
}

impl fmt::Debug for AppClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppClassLoader")
            .field("id", &self.id)
            .field("delegation", &self.delegation)
            .field("containers", &self.containers.len())
            .field("private_libraries", &self.private_libraries)
            .field("common_libraries", &self.common_libraries)
            .field("generated_classes", &self.generated_classes)
            .finish_non_exhaustive()
    }
}

impl AppClassLoader {
    pub(crate) fn new(
        config: &ClassLoaderConfiguration,
        parent: LoaderRef,
        libraries: Arc<LibraryResolver>,
        system_transformers: Arc<TransformerList>,
        generators: Arc<GeneratorRegistry>,
        global: Arc<GlobalConfig>,
    ) -> Arc<AppClassLoader> {
        Arc::new(AppClassLoader {
            id: config.id().clone(),
            delegation: config.delegation(),
            parent,
            containers: config.containers().to_vec(),
            native_containers: config.native_library_containers().to_vec(),
            private_libraries: config.private_libraries().to_vec(),
            common_libraries: config.common_libraries().to_vec(),
            libraries,
            pipeline: TransformerPipeline::new(system_transformers, global),
            generators,
            generated_classes: config.generated_classes(),
            domain_template: config.protection_domain().cloned(),
            classes: ClassMap::new(),
            packages: PackageMap::new(),
            domains: DomainMap::new(),
        })
    }

    /// Position of the parent in this loader's resolution order.
    pub fn delegation(&self) -> DelegationOrder {
        self.delegation
    }

    /// Register a transformer on this loader's own pipeline tier.
    ///
    /// Loader-tier transformers run after the system tier and are never skipped
    /// for cache-served bytes.
    pub fn add_transformer(&self, transformer: Arc<dyn ClassTransformer>) {
        self.pipeline.add_transformer(transformer);
    }

    /// Remove a loader-tier transformer, reporting whether it was registered.
    pub fn remove_transformer(&self, transformer: &Arc<dyn ClassTransformer>) -> bool {
        self.pipeline.remove_transformer(transformer)
    }

    /// The class this loader defined under a name, if any.
    ///
    /// A peek into the defined class table, never triggers a load. Classes
    /// resolved through delegation or libraries are recorded by their defining
    /// loader, not here.
    pub fn loaded_class(&self, name: &str) -> Option<LoadedClassRc> {
        self.classes.get(name).map(|entry| entry.value().clone())
    }

    /// The package record this loader defined under a name, if any.
    pub fn package(&self, name: &str) -> Option<PackageRc> {
        self.packages.get(name).map(|entry| entry.value().clone())
    }

    /// Locate a native library on the native library class path.
    ///
    /// Tries the platform-mangled forms of the bare library name, `lib<name>.so`
    /// first, and answers the entry URL of the first hit.
    ///
    /// # Arguments
    /// * `name` - Bare library name, without prefix or extension
    pub fn find_native_library(&self, name: &str) -> Option<String> {
        let candidates = [
            format!("lib{name}.so"),
            format!("{name}.so"),
            format!("lib{name}.dylib"),
            format!("{name}.dylib"),
            format!("{name}.dll"),
        ];

        for container in &self.native_containers {
            for candidate in &candidates {
                if container.has_entry(candidate) {
                    return Some(container.entry_url(candidate));
                }
            }
        }

        None
    }

    /// Resolve a class against the local step only, parent excluded.
    ///
    /// Containers first, then private and common libraries, then generators.
    pub(crate) fn load_locally(&self, name: &str) -> Result<LoadedClassRc> {
        if let Some(info) = self.find_class_bytes(name)? {
            return self.define_found_class(name, &info);
        }

        if let Some(class) = self.load_from_libraries(name)? {
            return Ok(class);
        }

        if let Some(bytes) = self.generate_for(name, self)? {
            return self.define_generated_class(name, bytes);
        }

        Err(Error::NotFound {
            class: name.to_string(),
        })
    }

    /// Read a class record off the configured containers, first hit wins.
    pub(crate) fn find_class_bytes(&self, name: &str) -> Result<Option<ByteResourceInformation>> {
        let path = resource_path(name);

        for container in &self.containers {
            if let Some(entry) = container.entry(&path)? {
                return Ok(Some(ByteResourceInformation::new(
                    entry.data,
                    path,
                    container.clone(),
                    entry.cached,
                )));
            }
        }

        Ok(None)
    }

    /// Resolve a class through the configured libraries, private ones first.
    ///
    /// Libraries whose loader has not been resolved yet are skipped, a deferred
    /// library does not serve classes until its availability is signalled.
    pub(crate) fn load_from_libraries(&self, name: &str) -> Result<Option<LoadedClassRc>> {
        for library in self.private_libraries.iter().chain(&self.common_libraries) {
            let Some(loader) = self.libraries.get_library(library) else {
                continue;
            };

            match loader.load_class(name) {
                Ok(class) => {
                    debug!("{}: library {library} supplied {name}", self.id);
                    return Ok(Some(class));
                }
                Err(Error::NotFound { .. }) => {}
                Err(error) => return Err(error),
            }
        }

        Ok(None)
    }

    /// Ask the generator registry for a class, when generation is enabled here.
    pub(crate) fn generate_for(
        &self,
        name: &str,
        requester: &dyn ClassLoader,
    ) -> Result<Option<Vec<u8>>> {
        if !self.generated_classes || self.generators.is_empty() {
            return Ok(None);
        }

        self.generators.generate(name, requester)
    }

    pub(crate) fn pipeline(&self) -> &TransformerPipeline {
        &self.pipeline
    }

    pub(crate) fn domain_template(&self) -> Option<&Permissions> {
        self.domain_template.as_ref()
    }

    fn define_found_class(&self, name: &str, info: &ByteResourceInformation) -> Result<LoadedClassRc> {
        let bytes = self.pipeline.transform(name, info)?;
        verify_class_bytes(name, &bytes)?;

        let package = define_package(&self.packages, name, info.container());
        let domain = domain_for(
            &self.domains,
            &info.code_source_location(),
            self.domain_template.as_ref(),
        );

        debug!("{}: defining {name} from {}", self.id, info.code_source_location());
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
            self.domain_template.as_ref(),
        );

        debug!("{}: defining generated class {name}", self.id);
        let class = Arc::new(LoadedClass::new(name, bytes, self.id.clone(), package, domain));

        Ok(self
            .classes
            .get_or_insert(name.to_string(), class)
            .value()
            .clone())
    }

    fn local_resource(&self, path: &str) -> Option<Resource> {
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
                        "{}: skipping unreadable container {} - {error}",
                        self.id,
                        container.physical_location()
                    );
                }
            }
        }

        for library in self.private_libraries.iter().chain(&self.common_libraries) {
            if let Some(resource) = self
                .libraries
                .get_library(library)
                .and_then(|loader| loader.resource(path))
            {
                return Some(resource);
            }
        }

        None
    }
}

impl ClassLoader for AppClassLoader {
    fn identity(&self) -> &ClassLoaderIdentity {
        &self.id
    }

    fn load_class(&self, name: &str) -> Result<LoadedClassRc> {
        if let Some(existing) = self.classes.get(name) {
            return Ok(existing.value().clone());
        }

        match self.delegation {
            DelegationOrder::ParentFirst => match self.parent.load_class(name) {
                Ok(class) => Ok(class),
                Err(Error::NotFound { .. }) => self.load_locally(name),
                Err(error) => Err(error),
            },
            DelegationOrder::ParentLast => match self.load_locally(name) {
                Ok(class) => Ok(class),
                Err(Error::NotFound { .. }) => self.parent.load_class(name),
                Err(error) => Err(error),
            },
        }
    }

    fn resource(&self, path: &str) -> Option<Resource> {
        match self.delegation {
            DelegationOrder::ParentFirst => self
                .parent
                .resource(path)
                .or_else(|| self.local_resource(path)),
            DelegationOrder::ParentLast => self
                .local_resource(path)
                .or_else(|| self.parent.resource(path)),
        }
    }

    fn parent(&self) -> Option<LoaderRef> {
        Some(self.parent.clone())
    }
}
