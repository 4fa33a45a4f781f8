//! The owning service composing loaders into delegation chains.
//!
//! One [`ClassLoadingService`] owns everything the loaders of a process share:
//! the registry of live loaders, the system loader at the root of every chain,
//! the module installer gateways wire through, the shared library resolver, the
//! service-wide API type declarations, the system transformer tier and the
//! class generator registry. Applications never construct loaders directly,
//! they describe them with [`crate::loader::ClassLoaderConfiguration`] and let
//! the service build and register them.
//!
//! # Architecture
//!
//! Creation comes in three forms. A top level loader gets a freshly wired
//! gateway as its parent and serves an application's root class path. A child
//! loader names its parent by identity and is attached below it, serving a
//! nested scope of the same application. A shadow loader mirrors a registered
//! loader for fresh class copies and is handed to the caller without being
//! registered. Destruction deregisters by identity, in-flight references keep
//! the loader working until dropped.
//!
//! # Usage Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use classgate::{
//!     container::{ContainerRef, MemoryContainer},
//!     library::{LibraryDefinition, LibraryProvider},
//!     loader::{
//!         ApiAccess, ClassLoader, ClassLoaderConfiguration, ClassLoaderIdentity,
//!         DefaultModuleInstaller, GatewayConfiguration, SystemClassLoader,
//!     },
//!     service::{ClassLoadingService, GlobalConfig},
//! };
//!
//! struct NoLibraries;
//!
//! impl LibraryProvider for NoLibraries {
//!     fn lookup(&self, _name: &str) -> Option<LibraryDefinition> {
//!         None
//!     }
//! }
//!
//! let platform = Arc::new(MemoryContainer::archive("memory:/platform.jar"));
//! platform.add_class("platform.Runtime", vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 52]);
//!
//! let service = ClassLoadingService::new(
//!     Arc::new(SystemClassLoader::new(vec![platform as ContainerRef])),
//!     Arc::new(DefaultModuleInstaller),
//!     Arc::new(NoLibraries),
//!     ApiAccess::new(),
//!     GlobalConfig::new(),
//! );
//!
//! let loader = service.create_top_level_class_loader(
//!     None,
//!     GatewayConfiguration::new("inventory"),
//!     ClassLoaderConfiguration::new(ClassLoaderIdentity::new("inventory", "app")),
//! )?;
//!
//! let class = loader.load_class("platform.Runtime")?;
//! assert_eq!(class.defined_by().to_string(), "platform:system");
//! # Ok::<(), classgate::Error>(())
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::{
    library::{LibraryProvider, LibraryResolver},
    loader::{
        ApiAccess, AppClassLoader, ClassGenerator, ClassLoaderConfiguration,
        ClassLoaderIdentity, ClassLoaderRegistry, GatewayClassLoader, GatewayConfiguration,
        GeneratorRegistry, LoaderRef, ModuleInstaller, ShadowClassLoader,
    },
    transform::{ClassTransformer, TransformerList},
    Error, Result,
};

/// Service-wide settings shared by every loader.
///
/// # Examples
///
/// ```rust
/// use classgate::service::GlobalConfig;
///
/// let global = GlobalConfig::new().with_beta_edition(true);
/// assert!(global.beta_edition());
/// ```
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    /// Whether the beta edition override is active
    beta_edition: bool,
}

impl GlobalConfig {
    /// Create the default settings, beta edition off.
    pub fn new() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// Toggle the beta edition override.
    ///
    /// When active, system transformers re-run even on bytes served from a
    /// pre-processed cache, since cached output from a released edition cannot
    /// be trusted to match beta transformers.
    #[must_use]
    pub fn with_beta_edition(mut self, beta_edition: bool) -> GlobalConfig {
        self.beta_edition = beta_edition;
        self
    }

    /// Whether the beta edition override is active.
    pub fn beta_edition(&self) -> bool {
        self.beta_edition
    }
}

/// The service that builds, registers and destroys class loaders.
pub struct ClassLoadingService {
    /// Live application loaders by identity
    registry: Arc<ClassLoaderRegistry>,
    /// The loader at the root of every chain
    system: LoaderRef,
    /// Module layer hook for gateway wiring
    installer: Arc<dyn ModuleInstaller>,
    /// Shared library resolver
    libraries: Arc<LibraryResolver>,
    /// Service-wide API type declarations
    api_access: Arc<ApiAccess>,
    /// Service-wide settings
    global: Arc<GlobalConfig>,
    /// Transformers applied by every loader of this service
    system_transformers: Arc<TransformerList>,
    /// Generators consulted by loaders with generation enabled
    generators: Arc<GeneratorRegistry>,
}

impl ClassLoadingService {
    /// Create a service over a system loader and its platform hooks.
    ///
    /// # Arguments
    /// * `system` - The loader at the root of every delegation chain
    /// * `installer` - Module layer hook gateways wire through
    /// * `library_provider` - Source of shared library definitions
    /// * `api_access` - Service-wide API type declarations
    /// * `global` - Service-wide settings
    pub fn new(
        system: LoaderRef,
        installer: Arc<dyn ModuleInstaller>,
        library_provider: Arc<dyn LibraryProvider>,
        api_access: ApiAccess,
        global: GlobalConfig,
    ) -> ClassLoadingService {
        ClassLoadingService {
            registry: Arc::new(ClassLoaderRegistry::new()),
            system,
            installer,
            libraries: Arc::new(LibraryResolver::new(library_provider)),
            api_access: Arc::new(api_access),
            global: Arc::new(global),
            system_transformers: Arc::new(TransformerList::new()),
            generators: Arc::new(GeneratorRegistry::new()),
        }
    }

    /// Create and register an application's top level loader.
    ///
    /// A fresh gateway is wired as the loader's parent. When the loader
    /// configuration declares its own API type visibility it overrides the
    /// gateway configuration's value, the loader configuration is what an
    /// application's deployment descriptor populates.
    ///
    /// # Arguments
    /// * `parent` - Platform-side loader placed above the gateway, or `None`
    /// * `gateway_config` - Platform-facing settings for the new gateway
    /// * `config` - Class path and behavior of the new loader
    ///
    /// # Errors
    /// Returns [`crate::Error::GatewayResolution`] when the gateway module
    /// cannot be wired and [`crate::Error::DuplicateIdentity`] when a loader
    /// with the same identity is already registered. Neither case leaves
    /// anything behind, the failed loader is never registered.
    pub fn create_top_level_class_loader(
        &self,
        parent: Option<LoaderRef>,
        gateway_config: GatewayConfiguration,
        config: ClassLoaderConfiguration,
    ) -> Result<Arc<AppClassLoader>> {
        let gateway_config = match config.api_visibility() {
            Some(visibility) => gateway_config.with_api_visibility(visibility),
            None => gateway_config,
        };

        let gateway: LoaderRef = Arc::new(GatewayClassLoader::new(
            parent,
            gateway_config,
            self.system.clone(),
            self.api_access.clone(),
            self.installer.as_ref(),
        )?);

        self.build_and_register(&config, gateway)
    }

    /// Create and register a child loader below a registered parent.
    ///
    /// # Arguments
    /// * `config` - Class path and behavior of the new loader, its parent
    ///   field names the loader to attach below
    ///
    /// # Errors
    /// Returns [`crate::Error::Error`] when the configuration names no parent,
    /// [`crate::Error::LoaderNotRegistered`] when the named parent is not
    /// registered and [`crate::Error::DuplicateIdentity`] when the child's
    /// identity is taken.
    pub fn create_child_class_loader(
        &self,
        config: ClassLoaderConfiguration,
    ) -> Result<Arc<AppClassLoader>> {
        let Some(parent_id) = config.parent() else {
            return Err(Error::Error(format!(
                "Configuration for {} names no parent loader",
                config.id()
            )));
        };

        let parent = self
            .registry
            .get(parent_id)
            .ok_or_else(|| Error::LoaderNotRegistered(parent_id.clone()))?;

        self.build_and_register(&config, parent)
    }

    /// Create a shadow of a registered loader.
    ///
    /// The shadow is handed to the caller without being registered, it lives
    /// as long as the caller holds it.
    ///
    /// # Errors
    /// Returns [`crate::Error::LoaderNotRegistered`] when no loader with the
    /// given identity is registered.
    pub fn create_shadow_class_loader(
        &self,
        id: &ClassLoaderIdentity,
    ) -> Result<Arc<ShadowClassLoader>> {
        let surrogate = self
            .registry
            .get(id)
            .ok_or_else(|| Error::LoaderNotRegistered(id.clone()))?;

        debug!("Creating shadow loader for {id}");
        Ok(Arc::new(ShadowClassLoader::new(surrogate)))
    }

    /// Deregister a loader, reporting whether it was registered.
    ///
    /// References held elsewhere keep the loader functional until dropped, the
    /// service merely stops handing it out as a parent.
    pub fn destroy_class_loader(&self, id: &ClassLoaderIdentity) -> bool {
        self.registry.deregister(id).is_some()
    }

    /// Register a transformer on the system tier of every loader.
    pub fn add_system_transformer(&self, transformer: Arc<dyn ClassTransformer>) {
        self.system_transformers.add(transformer);
    }

    /// Remove a system tier transformer, reporting whether it was registered.
    pub fn remove_system_transformer(&self, transformer: &Arc<dyn ClassTransformer>) -> bool {
        self.system_transformers.remove(transformer)
    }

    /// Register a class generator consulted by loaders with generation enabled.
    pub fn add_generator(&self, generator: Arc<dyn ClassGenerator>) {
        self.generators.add(generator);
    }

    /// Remove a class generator, reporting whether it was registered.
    pub fn remove_generator(&self, generator: &Arc<dyn ClassGenerator>) -> bool {
        self.generators.remove(generator)
    }

    /// Signal that a deferred or asynchronous library is now available.
    ///
    /// Resolves the library's loader and notifies registered listeners. See
    /// [`crate::library::LibraryResolver::notify_library_available`].
    pub fn notify_library_available(&self, name: &str) -> bool {
        self.libraries.notify_library_available(name)
    }

    /// The registry of live application loaders.
    pub fn registry(&self) -> &Arc<ClassLoaderRegistry> {
        &self.registry
    }

    /// The shared library resolver of this service.
    pub fn library_resolver(&self) -> &Arc<LibraryResolver> {
        &self.libraries
    }

    /// The loader at the root of every delegation chain.
    pub fn system_loader(&self) -> &LoaderRef {
        &self.system
    }

    fn build_and_register(
        &self,
        config: &ClassLoaderConfiguration,
        parent: LoaderRef,
    ) -> Result<Arc<AppClassLoader>> {
        let loader = AppClassLoader::new(
            config,
            parent,
            self.libraries.clone(),
            self.system_transformers.clone(),
            self.generators.clone(),
            self.global.clone(),
        );

        self.registry.register(loader.clone())?;
        Ok(loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        container::{ContainerRef, MemoryContainer},
        loader::{ApiTypes, ClassLoader, DefaultModuleInstaller, SystemClassLoader},
        test::{class_bytes, class_payload, AppendTransformer, StaticLibraryProvider},
    };

    fn container_with(location: &str, entries: &[(&str, &str)]) -> ContainerRef {
        let container = Arc::new(MemoryContainer::archive(location));
        for (class, payload) in entries {
            container.add_class(class, class_bytes(payload));
        }
        container
    }

    fn service_over(platform: &[(&str, &str)]) -> ClassLoadingService {
        ClassLoadingService::new(
            Arc::new(SystemClassLoader::new(vec![container_with(
                "memory:/platform.jar",
                platform,
            )])),
            Arc::new(DefaultModuleInstaller),
            Arc::new(StaticLibraryProvider::new()),
            ApiAccess::new(),
            GlobalConfig::new(),
        )
    }

    fn identity(application: &str, qualifier: &str) -> ClassLoaderIdentity {
        ClassLoaderIdentity::new(application, qualifier)
    }

    #[test]
    fn top_level_loaders_reach_the_platform() {
        let service = service_over(&[("platform.Runtime", "runtime")]);

        let loader = service
            .create_top_level_class_loader(
                None,
                GatewayConfiguration::new("inventory"),
                ClassLoaderConfiguration::new(identity("inventory", "app"))
                    .with_container(container_with("memory:/app.jar", &[("com.example.A", "a")])),
            )
            .unwrap();

        assert_eq!(service.registry().len(), 1);
        assert_eq!(
            loader.load_class("platform.Runtime").map(|class| class_payload(&class)).unwrap(),
            "runtime"
        );
        assert_eq!(
            loader.load_class("com.example.A").unwrap().defined_by().to_string(),
            "inventory:app"
        );
        assert_eq!(
            loader.parent().unwrap().identity().to_string(),
            "gateway:inventory"
        );
    }

    #[test]
    fn children_attach_below_registered_parents() {
        let service = service_over(&[]);
        service
            .create_top_level_class_loader(
                None,
                GatewayConfiguration::new("inventory"),
                ClassLoaderConfiguration::new(identity("inventory", "app"))
                    .with_container(container_with("memory:/app.jar", &[("com.example.A", "a")])),
            )
            .unwrap();

        let child = service
            .create_child_class_loader(
                ClassLoaderConfiguration::new(identity("inventory", "web"))
                    .with_parent(identity("inventory", "app")),
            )
            .unwrap();

        assert_eq!(
            child.load_class("com.example.A").unwrap().defined_by().to_string(),
            "inventory:app"
        );
    }

    #[test]
    fn children_need_an_existing_parent() {
        let service = service_over(&[]);

        let unnamed = service
            .create_child_class_loader(ClassLoaderConfiguration::new(identity("inventory", "web")));
        assert!(matches!(unnamed.unwrap_err(), Error::Error(_)));

        let unknown = service.create_child_class_loader(
            ClassLoaderConfiguration::new(identity("inventory", "web"))
                .with_parent(identity("inventory", "app")),
        );
        match unknown.unwrap_err() {
            Error::LoaderNotRegistered(id) => assert_eq!(id, identity("inventory", "app")),
            other => panic!("Expected LoaderNotRegistered, got {other:?}"),
        }
        assert!(service.registry().is_empty());
    }

    #[test]
    fn duplicate_identities_never_register() {
        let service = service_over(&[]);
        let config = || {
            ClassLoaderConfiguration::new(identity("inventory", "app"))
        };

        service
            .create_top_level_class_loader(None, GatewayConfiguration::new("inventory"), config())
            .unwrap();
        let result = service.create_top_level_class_loader(
            None,
            GatewayConfiguration::new("inventory"),
            config(),
        );

        assert!(matches!(result.unwrap_err(), Error::DuplicateIdentity(_)));
        assert_eq!(service.registry().len(), 1);
    }

    #[test]
    fn destruction_deregisters_but_does_not_disable() {
        let service = service_over(&[]);
        let loader = service
            .create_top_level_class_loader(
                None,
                GatewayConfiguration::new("inventory"),
                ClassLoaderConfiguration::new(identity("inventory", "app"))
                    .with_container(container_with("memory:/app.jar", &[("com.example.A", "a")])),
            )
            .unwrap();

        assert!(service.destroy_class_loader(&identity("inventory", "app")));
        assert!(!service.destroy_class_loader(&identity("inventory", "app")));
        assert!(service.registry().is_empty());

        // Held references keep resolving.
        assert!(loader.load_class("com.example.A").is_ok());
    }

    #[test]
    fn shadows_require_a_registered_surrogate() {
        let service = service_over(&[]);
        assert!(matches!(
            service.create_shadow_class_loader(&identity("inventory", "app")).unwrap_err(),
            Error::LoaderNotRegistered(_)
        ));

        service
            .create_top_level_class_loader(
                None,
                GatewayConfiguration::new("inventory"),
                ClassLoaderConfiguration::new(identity("inventory", "app")),
            )
            .unwrap();

        let shadow = service.create_shadow_class_loader(&identity("inventory", "app")).unwrap();
        assert_eq!(shadow.identity().to_string(), "inventory:app-shadow");
    }

    #[test]
    fn system_transformers_reach_every_loader() {
        let service = service_over(&[]);
        let stamp = Arc::new(AppendTransformer::new(b"-sys"));
        service.add_system_transformer(stamp.clone());

        let loader = service
            .create_top_level_class_loader(
                None,
                GatewayConfiguration::new("inventory"),
                ClassLoaderConfiguration::new(identity("inventory", "app"))
                    .with_container(container_with("memory:/app.jar", &[("com.example.A", "plain")])),
            )
            .unwrap();

        assert_eq!(
            class_payload(&loader.load_class("com.example.A").unwrap()),
            "plain-sys"
        );

        assert!(service.remove_system_transformer(&(stamp as Arc<dyn ClassTransformer>)));
    }

    #[test]
    fn loader_api_visibility_overrides_the_gateway() {
        let mut access = ApiAccess::new();
        access.declare("platform.internal", ApiTypes::PLATFORM);

        let service = ClassLoadingService::new(
            Arc::new(SystemClassLoader::new(vec![container_with(
                "memory:/platform.jar",
                &[("platform.internal.Secrets", "internal")],
            )])),
            Arc::new(DefaultModuleInstaller),
            Arc::new(StaticLibraryProvider::new()),
            access,
            GlobalConfig::new(),
        );

        let loader = service
            .create_top_level_class_loader(
                None,
                GatewayConfiguration::new("inventory"),
                ClassLoaderConfiguration::new(identity("inventory", "app"))
                    .with_api_visibility(ApiTypes::API),
            )
            .unwrap();

        assert!(matches!(
            loader.load_class("platform.internal.Secrets").unwrap_err(),
            Error::NotFound { .. }
        ));
    }
}
