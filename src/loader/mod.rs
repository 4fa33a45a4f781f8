//! The class loader hierarchy.
//!
//! This module implements the loaders an owning service composes into per
//! application delegation chains, plus the records a successful load produces.
//!
//! # Architecture
//!
//! Every chain has the same shape. At the root sits the [`SystemClassLoader`]
//! over the platform's own class path. Each application reaches it through one
//! [`GatewayClassLoader`], which wires the application into the module layer,
//! applies API type visibility and decides whether unresolved names fall
//! through to the system loader. Below the gateway, [`AppClassLoader`]
//! instances serve the application's class paths with parent-first or
//! parent-last delegation, pulling in shared libraries and generated classes
//! as configured. A [`ShadowClassLoader`] can mirror any application loader to
//! produce fresh copies of its classes without touching its defined class
//! table.
//!
//! # Key Components
//!
//! - [`ClassLoader`] - the trait every loader implements, dynamic dispatch
//!   keeps chains heterogeneous
//! - [`ClassLoaderIdentity`] - the `application:qualifier` name a loader
//!   defines classes under
//! - [`LoadedClass`] - the immutable record of a defined class
//! - [`ClassLoaderConfiguration`] / [`GatewayConfiguration`] - builder-style
//!   inputs the owning service constructs loaders from
//! - [`ClassLoaderRegistry`] - the identity-keyed table of live application
//!   loaders
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! let loader = service.create_top_level_class_loader(None, gateway_config, config)?;
//!
//! let class = loader.load_class("com.example.Widget")?;
//! assert_eq!(class.defined_by(), loader.identity());
//!
//! let settings = loader.resource("com/example/settings.properties");
//! ```

mod api;
mod application;
mod bytes;
mod class;
mod config;
mod gateway;
mod generator;
mod identity;
mod package;
mod registry;
mod security;
mod shadow;
mod system;

pub use api::{ApiAccess, ApiType, ApiTypes};
pub use application::AppClassLoader;
pub use bytes::ByteResourceInformation;
pub use class::{LoadedClass, LoadedClassRc, CLASS_MAGIC};
pub use config::{ClassLoaderConfiguration, DelegationOrder, GatewayConfiguration};
pub use gateway::{
    DefaultModuleInstaller, GatewayClassLoader, GatewayModule, ModuleInstaller,
    ModuleResolutionError,
};
pub use generator::{ClassGenerator, GeneratorRegistry};
pub use identity::ClassLoaderIdentity;
pub use package::{Package, PackageRc};
pub use registry::ClassLoaderRegistry;
pub use security::{CodeSource, Permissions, ProtectionDomain, ProtectionDomainRc};
pub use shadow::ShadowClassLoader;
pub use system::SystemClassLoader;

use std::sync::Arc;

use crate::{container::Resource, Result};

/// A shared handle to any loader in a delegation chain.
pub type LoaderRef = Arc<dyn ClassLoader>;

/// The behavior every loader in a delegation chain implements.
///
/// Loaders are thread safe and their methods take `&self`, concurrent loads
/// through the same chain are the normal case.
pub trait ClassLoader: Send + Sync {
    /// The identity this loader defines classes under.
    fn identity(&self) -> &ClassLoaderIdentity;

    /// Resolve and define a class by its dot-separated binary name.
    ///
    /// Repeated requests for the same name answer the same shared record, for
    /// this loader and for every loader that delegated the name here.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] when no loader in the chain supplies
    /// the class. Any other error means resolution was aborted, a malformed
    /// record, a failed transformer or an unreadable container does not fall
    /// through to the next loader.
    fn load_class(&self, name: &str) -> Result<LoadedClassRc>;

    /// Resolve a resource by its slash-separated path.
    ///
    /// Follows the same delegation shape as class loading. Resources are not
    /// cached and not transformed, every call re-reads the supplying
    /// container.
    fn resource(&self, path: &str) -> Option<Resource>;

    /// The loader this one delegates to, `None` at the root of a chain.
    fn parent(&self) -> Option<LoaderRef> {
        None
    }
}
