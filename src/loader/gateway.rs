//! The gateway class loader bridging applications to the platform.
//!
//! Every top level application loader delegates to a gateway. The gateway owns the
//! application's view of the platform: it wires a synthetic module into the module
//! layer at construction, filters packages through the application's declared API
//! type visibility, restricts what the module chain may import dynamically, and
//! decides whether unresolved names fall through to the system loader.
//!
//! The gateway's parent chain supplies platform-side overrides. When both the
//! parent chain and the system loader can serve a name, the parent chain wins,
//! which is how the platform substitutes its own version of a class the system
//! class path also carries.
//!
//! A gateway is immutable once constructed. Construction fails, with the module
//! layer's resolution error preserved, when the synthetic module cannot be wired,
//! and the owning service creates exactly one gateway per top level loader.

use thiserror::Error;
use tracing::{debug, error};

use crate::{
    container::Resource,
    error::DIAG_GATEWAY_RESOLUTION,
    loader::{
        class::{package_of, package_of_resource},
        ApiAccess, ClassLoader, ClassLoaderIdentity, GatewayConfiguration, LoadedClassRc,
        LoaderRef,
    },
    Result,
};

use std::{fmt, sync::Arc};

/// A resolution failure reported by the module layer.
///
/// Carried as the source of [`crate::Error::GatewayResolution`] so embedders can
/// surface the module layer's reason instead of a bare internal failure.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct ModuleResolutionError {
    /// Name of the module that failed to resolve
    pub module: String,
    /// The module layer's description of the failure
    pub reason: String,
}

impl ModuleResolutionError {
    /// Create a resolution error for a module.
    pub fn new(module: impl Into<String>, reason: impl Into<String>) -> ModuleResolutionError {
        ModuleResolutionError {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// The synthetic module wired for one gateway.
#[derive(Debug, Clone)]
pub struct GatewayModule {
    /// Module name, derived from the application name
    name: String,
    /// Dynamic import patterns granted to the module
    imports: Vec<String>,
}

impl GatewayModule {
    /// Create a module handle from its name and granted import patterns.
    pub fn new(name: impl Into<String>, imports: Vec<String>) -> GatewayModule {
        GatewayModule {
            name: name.into(),
            imports,
        }
    }

    /// Module name, derived from the application name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dynamic import patterns granted to the module.
    ///
    /// Patterns are exact package names, `prefix.*` subtree patterns or the lone
    /// wildcard `*`.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }
}

/// The module layer hook that wires gateway modules.
///
/// Implemented by the embedder over its module framework. The default installer
/// grants whatever is asked, which is the right behavior for compositions without
/// a live module layer.
pub trait ModuleInstaller: Send + Sync {
    /// Wire a synthetic module with the requested dynamic imports.
    ///
    /// # Arguments
    /// * `module_name` - Name of the synthetic module to wire
    /// * `dynamic_imports` - Import patterns the module requests
    ///
    /// # Errors
    /// Returns the module layer's resolution error when wiring fails, gateway
    /// construction aborts with it.
    fn install(
        &self,
        module_name: &str,
        dynamic_imports: &[String],
    ) -> std::result::Result<GatewayModule, ModuleResolutionError>;
}

/// An installer that wires every requested module as asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultModuleInstaller;

impl ModuleInstaller for DefaultModuleInstaller {
    fn install(
        &self,
        module_name: &str,
        dynamic_imports: &[String],
    ) -> std::result::Result<GatewayModule, ModuleResolutionError> {
        Ok(GatewayModule::new(module_name, dynamic_imports.to_vec()))
    }
}

/// The gateway loader of one application.
///
/// Resolution order: the API type gate first, then the parent chain subject to the
/// dynamic import filter, then the system loader when system delegation is enabled.
/// Only a miss moves resolution to the next step, any other failure aborts the
/// load.
pub struct GatewayClassLoader {
    /// Identity, `gateway:<application>`
    id: ClassLoaderIdentity,
    /// The synthetic module wired for this gateway
    module: GatewayModule,
    /// Platform-side override chain, if any
    parent: Option<LoaderRef>,
    /// The system loader behind this gateway
    system: LoaderRef,
    /// Platform-facing settings
    config: GatewayConfiguration,
    /// Service-wide API type declarations
    api_access: Arc<ApiAccess>,
}

impl fmt::Debug for GatewayClassLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClassLoader")
            .field("id", &self.id)
            .field("module", &self.module)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GatewayClassLoader {
    /// Construct a gateway, wiring its synthetic module.
    ///
    /// The module is named `gateway.module.<application>` and requests the
    /// configuration's dynamic import packages, defaulting to the lone wildcard
    /// when none are configured.
    ///
    /// # Arguments
    /// * `parent` - Platform-side override chain, or `None`
    /// * `config` - Platform-facing settings for this gateway
    /// * `system` - The system loader unresolved names fall through to
    /// * `api_access` - Service-wide API type declarations
    /// * `installer` - Module layer hook that wires the synthetic module
    ///
    /// # Errors
    /// Returns [`crate::Error::GatewayResolution`] when the module layer fails to
    /// wire the module. The underlying [`ModuleResolutionError`] is preserved as
    /// the source.
    pub fn new(
        parent: Option<LoaderRef>,
        config: GatewayConfiguration,
        system: LoaderRef,
        api_access: Arc<ApiAccess>,
        installer: &dyn ModuleInstaller,
    ) -> Result<GatewayClassLoader> {
        let module_name = format!("gateway.module.{}", config.application_name());
        let imports = match config.dynamic_import_packages() {
            Some(packages) => packages.to_vec(),
            None => vec!["*".to_string()],
        };

        let module = match installer.install(&module_name, &imports) {
            Ok(module) => module,
            Err(source) => {
                error!(
                    "{DIAG_GATEWAY_RESOLUTION}: gateway module {module_name} for application {} could not be resolved - {source}",
                    config.application_name()
                );
                return Err(crate::Error::GatewayResolution {
                    module: module_name,
                    source,
                });
            }
        };

        Ok(GatewayClassLoader {
            id: ClassLoaderIdentity::new("gateway", config.application_name()),
            module,
            parent,
            system,
            config,
            api_access,
        })
    }

    /// The synthetic module wired for this gateway.
    pub fn module(&self) -> &GatewayModule {
        &self.module
    }

    /// Whether the API type gate lets the application see a package.
    fn permits(&self, package: Option<&str>) -> bool {
        match package {
            Some(package) => self
                .api_access
                .permits(package, self.config.api_visibility()),
            None => true,
        }
    }

    /// Whether the dynamic import filter lets the module chain serve a package.
    fn import_allowed(&self, package: Option<&str>) -> bool {
        let Some(package) = package else {
            return true;
        };

        self.module
            .imports()
            .iter()
            .any(|pattern| GatewayClassLoader::matches_package(pattern, package))
    }

    fn matches_package(pattern: &str, package: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if let Some(prefix) = pattern.strip_suffix(".*") {
            return package == prefix
                || (package.starts_with(prefix)
                    && package.as_bytes().get(prefix.len()) == Some(&b'.'));
        }

        pattern == package
    }
}

impl ClassLoader for GatewayClassLoader {
    fn identity(&self) -> &ClassLoaderIdentity {
        &self.id
    }

    fn load_class(&self, name: &str) -> Result<LoadedClassRc> {
        let package = package_of(name);

        if !self.permits(package) {
            debug!(
                "{}: API type visibility hides {name} from application {}",
                self.id,
                self.config.application_name()
            );
            return Err(crate::Error::NotFound {
                class: name.to_string(),
            });
        }

        if let Some(parent) = &self.parent {
            if self.import_allowed(package) {
                match parent.load_class(name) {
                    Ok(class) => return Ok(class),
                    Err(crate::Error::NotFound { .. }) => {}
                    Err(error) => return Err(error),
                }
            }
        }

        if self.config.delegate_to_system() {
            return self.system.load_class(name);
        }

        Err(crate::Error::NotFound {
            class: name.to_string(),
        })
    }

    fn resource(&self, path: &str) -> Option<Resource> {
        let package = package_of_resource(path);

        if !self.permits(package.as_deref()) {
            return None;
        }

        if let Some(parent) = &self.parent {
            if self.import_allowed(package.as_deref()) {
                if let Some(resource) = parent.resource(path) {
                    return Some(resource);
                }
            }
        }

        if self.config.delegate_to_system() {
            return self.system.resource(path);
        }

        None
    }

    fn parent(&self) -> Option<LoaderRef> {
        self.parent.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        container::{ContainerRef, MemoryContainer},
        loader::{ApiTypes, SystemClassLoader},
        test::{class_bytes, class_payload},
    };

    fn loader_over(entries: &[(&str, &str)]) -> LoaderRef {
        let container = Arc::new(MemoryContainer::archive("memory:/tier.jar"));
        for (class, payload) in entries {
            container.add_class(class, class_bytes(payload));
        }
        Arc::new(SystemClassLoader::new(vec![container as ContainerRef]))
    }

    fn gateway(
        parent: Option<LoaderRef>,
        config: GatewayConfiguration,
        system: LoaderRef,
        access: ApiAccess,
    ) -> GatewayClassLoader {
        GatewayClassLoader::new(
            parent,
            config,
            system,
            Arc::new(access),
            &DefaultModuleInstaller,
        )
        .unwrap()
    }

    #[test]
    fn parent_overrides_the_system_version() {
        let parent = loader_over(&[("platform.Clock", "parent-version")]);
        let system = loader_over(&[
            ("platform.Clock", "system-version"),
            ("platform.Paths", "system-only"),
        ]);

        let gateway = gateway(
            Some(parent),
            GatewayConfiguration::new("inventory"),
            system,
            ApiAccess::new(),
        );

        let clock = gateway.load_class("platform.Clock").unwrap();
        assert_eq!(class_payload(&clock), "parent-version");

        let paths = gateway.load_class("platform.Paths").unwrap();
        assert_eq!(class_payload(&paths), "system-only");
    }

    #[test]
    fn system_delegation_can_be_disabled() {
        let system = loader_over(&[("platform.Clock", "system-version")]);
        let gateway = gateway(
            None,
            GatewayConfiguration::new("inventory").with_delegate_to_system(false),
            system,
            ApiAccess::new(),
        );

        assert!(matches!(
            gateway.load_class("platform.Clock").unwrap_err(),
            crate::Error::NotFound { .. }
        ));
        assert!(gateway.resource("platform/Clock.class").is_none());
    }

    #[test]
    fn api_visibility_hides_undeclared_types() {
        let system = loader_over(&[
            ("platform.internal.Secrets", "internal"),
            ("platform.api.Widgets", "api"),
        ]);

        let mut access = ApiAccess::new();
        access.declare("platform.internal", ApiTypes::PLATFORM);
        access.declare("platform.api", ApiTypes::API);

        let gateway = gateway(
            None,
            GatewayConfiguration::new("inventory").with_api_visibility(ApiTypes::API),
            system,
            access,
        );

        assert!(gateway.load_class("platform.api.Widgets").is_ok());
        assert!(matches!(
            gateway.load_class("platform.internal.Secrets").unwrap_err(),
            crate::Error::NotFound { .. }
        ));
    }

    #[test]
    fn dynamic_imports_filter_the_parent_chain_only() {
        let parent = loader_over(&[
            ("allowed.Widget", "parent-allowed"),
            ("blocked.Widget", "parent-blocked"),
        ]);
        let system = loader_over(&[("blocked.Widget", "system-copy")]);

        let gateway = gateway(
            Some(parent),
            GatewayConfiguration::new("inventory")
                .with_dynamic_import_packages(["allowed.*"]),
            system,
            ApiAccess::new(),
        );

        let allowed = gateway.load_class("allowed.Widget").unwrap();
        assert_eq!(class_payload(&allowed), "parent-allowed");

        // The parent copy is unreachable, the system still serves the name.
        let blocked = gateway.load_class("blocked.Widget").unwrap();
        assert_eq!(class_payload(&blocked), "system-copy");
    }

    #[test]
    fn import_patterns() {
        assert!(GatewayClassLoader::matches_package("*", "any.thing"));
        assert!(GatewayClassLoader::matches_package("com.example", "com.example"));
        assert!(!GatewayClassLoader::matches_package("com.example", "com.example.sub"));
        assert!(GatewayClassLoader::matches_package("com.example.*", "com.example"));
        assert!(GatewayClassLoader::matches_package("com.example.*", "com.example.sub.deep"));
        assert!(!GatewayClassLoader::matches_package("com.example.*", "com.exampleplus"));
    }

    #[test]
    fn failed_module_wiring_aborts_construction() {
        struct RefusingInstaller;

        impl ModuleInstaller for RefusingInstaller {
            fn install(
                &self,
                module_name: &str,
                _dynamic_imports: &[String],
            ) -> std::result::Result<GatewayModule, ModuleResolutionError> {
                Err(ModuleResolutionError::new(
                    module_name,
                    "no bundle exports the requested packages",
                ))
            }
        }

        let system = loader_over(&[]);
        let result = GatewayClassLoader::new(
            None,
            GatewayConfiguration::new("inventory"),
            system,
            Arc::new(ApiAccess::new()),
            &RefusingInstaller,
        );

        match result.unwrap_err() {
            crate::Error::GatewayResolution { module, source } => {
                assert_eq!(module, "gateway.module.inventory");
                assert!(source.reason.contains("no bundle exports"));
            }
            other => panic!("Expected GatewayResolution, got {other:?}"),
        }
    }

    #[test]
    fn module_identity_reflects_the_application() {
        let system = loader_over(&[]);
        let gateway = gateway(
            None,
            GatewayConfiguration::new("inventory"),
            system,
            ApiAccess::new(),
        );

        assert_eq!(gateway.identity().to_string(), "gateway:inventory");
        assert_eq!(gateway.module().name(), "gateway.module.inventory");
        assert_eq!(gateway.module().imports(), ["*".to_string()]);
    }
}
