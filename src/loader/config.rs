//! Loader configuration value objects.
//!
//! Configurations describe a loader before it exists: its identity, class path,
//! delegation order, parent, shared library references and security posture for
//! application loaders, and the platform-facing settings for gateway loaders. The
//! owning service consumes a configuration when it builds the loader, the built
//! loader is immutable afterwards.

use std::fmt;

use crate::{
    container::ContainerRef,
    loader::{ApiTypes, ClassLoaderIdentity, Permissions},
};

/// How an application loader orders parent delegation against its own class path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DelegationOrder {
    /// Ask the parent chain first, search the local class path only on a miss
    #[default]
    ParentFirst,
    /// Search the local class path first, fall back to the parent chain on a miss
    ParentLast,
}

/// Configuration of an application class loader.
///
/// Built up with chained setters and handed to the owning service, which resolves
/// the parent identity, wires shared libraries and registers the resulting loader.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use classgate::{
///     container::MemoryContainer,
///     loader::{ClassLoaderConfiguration, ClassLoaderIdentity, DelegationOrder},
/// };
///
/// let config = ClassLoaderConfiguration::new(ClassLoaderIdentity::new("inventory", "app"))
///     .with_container(Arc::new(MemoryContainer::archive("memory:/inventory.jar")))
///     .with_delegation(DelegationOrder::ParentLast)
///     .with_common_library("commons");
///
/// assert_eq!(config.delegation(), DelegationOrder::ParentLast);
/// assert_eq!(config.containers().len(), 1);
/// ```
#[derive(Clone)]
pub struct ClassLoaderConfiguration {
    /// Identity the loader will register under
    id: ClassLoaderIdentity,
    /// Ordered class path containers
    containers: Vec<ContainerRef>,
    /// Ordered native library containers
    native_library_containers: Vec<ContainerRef>,
    /// Delegation order against the parent chain
    delegation: DelegationOrder,
    /// Identity of the parent loader, for child loaders
    parent: Option<ClassLoaderIdentity>,
    /// Names of shared libraries joined with shared instancing
    common_libraries: Vec<String>,
    /// Names of shared libraries requested for loader-private use
    private_libraries: Vec<String>,
    /// Permissions granted to every protection domain of the loader
    protection_domain: Option<Permissions>,
    /// API types the application declared, recorded for introspection
    api_visibility: Option<ApiTypes>,
    /// Whether deregistered-provider class generation is enabled
    generated_classes: bool,
}

impl ClassLoaderConfiguration {
    /// Create a configuration with empty class paths and parent-first delegation.
    ///
    /// # Arguments
    /// * `id` - Identity the loader will register under
    pub fn new(id: ClassLoaderIdentity) -> ClassLoaderConfiguration {
        ClassLoaderConfiguration {
            id,
            containers: Vec::new(),
            native_library_containers: Vec::new(),
            delegation: DelegationOrder::default(),
            parent: None,
            common_libraries: Vec::new(),
            private_libraries: Vec::new(),
            protection_domain: None,
            api_visibility: None,
            generated_classes: false,
        }
    }

    /// Append one container to the class path.
    #[must_use]
    pub fn with_container(mut self, container: ContainerRef) -> ClassLoaderConfiguration {
        self.containers.push(container);
        self
    }

    /// Replace the class path with the given containers.
    #[must_use]
    pub fn with_containers(mut self, containers: Vec<ContainerRef>) -> ClassLoaderConfiguration {
        self.containers = containers;
        self
    }

    /// Append one container to the native library search path.
    #[must_use]
    pub fn with_native_library_container(
        mut self,
        container: ContainerRef,
    ) -> ClassLoaderConfiguration {
        self.native_library_containers.push(container);
        self
    }

    /// Replace the native library search path.
    ///
    /// Passing `None` clears the search path, lookups against the loader then find
    /// no native libraries instead of failing.
    ///
    /// # Arguments
    /// * `containers` - The new search path, or `None` for an empty one
    pub fn set_native_library_containers(&mut self, containers: Option<Vec<ContainerRef>>) {
        self.native_library_containers = containers.unwrap_or_default();
    }

    /// Set the delegation order.
    #[must_use]
    pub fn with_delegation(mut self, delegation: DelegationOrder) -> ClassLoaderConfiguration {
        self.delegation = delegation;
        self
    }

    /// Name the parent loader this configuration builds a child of.
    #[must_use]
    pub fn with_parent(mut self, parent: ClassLoaderIdentity) -> ClassLoaderConfiguration {
        self.parent = Some(parent);
        self
    }

    /// Reference one shared library with shared instancing.
    #[must_use]
    pub fn with_common_library(mut self, name: impl Into<String>) -> ClassLoaderConfiguration {
        self.common_libraries.push(name.into());
        self
    }

    /// Reference one shared library for loader-private use.
    #[must_use]
    pub fn with_private_library(mut self, name: impl Into<String>) -> ClassLoaderConfiguration {
        self.private_libraries.push(name.into());
        self
    }

    /// Grant permissions to every protection domain this loader creates.
    #[must_use]
    pub fn with_protection_domain(mut self, permissions: Permissions) -> ClassLoaderConfiguration {
        self.protection_domain = Some(permissions);
        self
    }

    /// Record the API types the application declared.
    #[must_use]
    pub fn with_api_visibility(mut self, visibility: ApiTypes) -> ClassLoaderConfiguration {
        self.api_visibility = Some(visibility);
        self
    }

    /// Enable or disable deregistered-provider class generation.
    #[must_use]
    pub fn with_generated_classes(mut self, enabled: bool) -> ClassLoaderConfiguration {
        self.generated_classes = enabled;
        self
    }

    /// Identity the loader will register under.
    pub fn id(&self) -> &ClassLoaderIdentity {
        &self.id
    }

    /// Ordered class path containers.
    pub fn containers(&self) -> &[ContainerRef] {
        &self.containers
    }

    /// Ordered native library containers.
    pub fn native_library_containers(&self) -> &[ContainerRef] {
        &self.native_library_containers
    }

    /// Delegation order against the parent chain.
    pub fn delegation(&self) -> DelegationOrder {
        self.delegation
    }

    /// Identity of the parent loader, for child loaders.
    pub fn parent(&self) -> Option<&ClassLoaderIdentity> {
        self.parent.as_ref()
    }

    /// Names of shared libraries joined with shared instancing.
    pub fn common_libraries(&self) -> &[String] {
        &self.common_libraries
    }

    /// Names of shared libraries requested for loader-private use.
    pub fn private_libraries(&self) -> &[String] {
        &self.private_libraries
    }

    /// Permissions granted to every protection domain of the loader.
    pub fn protection_domain(&self) -> Option<&Permissions> {
        self.protection_domain.as_ref()
    }

    /// API types the application declared.
    pub fn api_visibility(&self) -> Option<ApiTypes> {
        self.api_visibility
    }

    /// Whether deregistered-provider class generation is enabled.
    pub fn generated_classes(&self) -> bool {
        self.generated_classes
    }
}

impl fmt::Debug for ClassLoaderConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassLoaderConfiguration")
            .field("id", &self.id)
            .field("delegation", &self.delegation)
            .field("containers", &self.containers.len())
            .field("native_library_containers", &self.native_library_containers.len())
            .field("parent", &self.parent)
            .field("common_libraries", &self.common_libraries)
            .field("private_libraries", &self.private_libraries)
            .field("api_visibility", &self.api_visibility)
            .field("generated_classes", &self.generated_classes)
            .finish_non_exhaustive()
    }
}

/// Configuration of a gateway class loader.
///
/// Gateways mediate between an application and the platform, their configuration
/// controls the platform-facing behavior: whether unresolved names fall through to
/// the system loader, which packages the module chain may wire dynamically, and the
/// API type visibility applied to platform packages.
#[derive(Debug, Clone)]
pub struct GatewayConfiguration {
    /// Name of the application this gateway serves
    application_name: String,
    /// Whether unresolved names fall through to the system loader
    delegate_to_system: bool,
    /// Package patterns the module chain may wire, `None` imports everything
    dynamic_import_packages: Option<Vec<String>>,
    /// API types visible to the application
    api_visibility: ApiTypes,
}

impl GatewayConfiguration {
    /// Create a gateway configuration with system delegation enabled, unrestricted
    /// dynamic imports and full API visibility.
    ///
    /// # Arguments
    /// * `application_name` - Name of the application the gateway serves
    pub fn new(application_name: impl Into<String>) -> GatewayConfiguration {
        GatewayConfiguration {
            application_name: application_name.into(),
            delegate_to_system: true,
            dynamic_import_packages: None,
            api_visibility: ApiTypes::all(),
        }
    }

    /// Control whether unresolved names fall through to the system loader.
    #[must_use]
    pub fn with_delegate_to_system(mut self, delegate: bool) -> GatewayConfiguration {
        self.delegate_to_system = delegate;
        self
    }

    /// Restrict which packages the module chain may wire dynamically.
    ///
    /// Patterns are exact package names, `prefix.*` subtree patterns or the lone
    /// wildcard `*`.
    #[must_use]
    pub fn with_dynamic_import_packages<I, S>(mut self, packages: I) -> GatewayConfiguration
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dynamic_import_packages =
            Some(packages.into_iter().map(Into::into).collect());
        self
    }

    /// Set the API types visible to the application.
    #[must_use]
    pub fn with_api_visibility(mut self, visibility: ApiTypes) -> GatewayConfiguration {
        self.api_visibility = visibility;
        self
    }

    /// Name of the application this gateway serves.
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Whether unresolved names fall through to the system loader.
    pub fn delegate_to_system(&self) -> bool {
        self.delegate_to_system
    }

    /// Package patterns the module chain may wire, `None` imports everything.
    pub fn dynamic_import_packages(&self) -> Option<&[String]> {
        self.dynamic_import_packages.as_deref()
    }

    /// API types visible to the application.
    pub fn api_visibility(&self) -> ApiTypes {
        self.api_visibility
    }
}
