//! # classgate Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the classgate library. Import this module to get quick access to the essential
//! types for composing class loading services.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all classgate operations
pub use crate::Error;

/// The result type used throughout classgate
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// The owning service that builds, registers and destroys loaders
pub use crate::service::{ClassLoadingService, GlobalConfig};

// ================================================================================================
// Loaders and Delegation
// ================================================================================================

/// The trait every loader implements, plus the shared handle type
pub use crate::loader::{ClassLoader, LoaderRef};

/// The concrete loaders of a delegation chain
pub use crate::loader::{
    AppClassLoader, GatewayClassLoader, ShadowClassLoader, SystemClassLoader,
};

/// Loader identity and lifecycle
pub use crate::loader::{ClassLoaderIdentity, ClassLoaderRegistry};

/// Declarative loader configuration
pub use crate::loader::{ClassLoaderConfiguration, DelegationOrder, GatewayConfiguration};

/// Gateway module wiring
pub use crate::loader::{
    DefaultModuleInstaller, GatewayModule, ModuleInstaller, ModuleResolutionError,
};

// ================================================================================================
// Defined Classes and Their Records
// ================================================================================================

/// The records a successful load produces
pub use crate::loader::{LoadedClass, LoadedClassRc, Package, PackageRc};

/// Protection domains and code sources
pub use crate::loader::{CodeSource, Permissions, ProtectionDomain, ProtectionDomainRc};

/// API type visibility declarations
pub use crate::loader::{ApiAccess, ApiType, ApiTypes};

/// Class generation hooks
pub use crate::loader::{ClassGenerator, GeneratorRegistry};

// ================================================================================================
// Transformation Pipeline
// ================================================================================================

/// Class transformers and the provenance record they receive
pub use crate::loader::ByteResourceInformation;
pub use crate::transform::{ClassTransformer, TransformerList, TransformerPipeline};

// ================================================================================================
// Shared Libraries
// ================================================================================================

/// Library definitions, resolution and notification
pub use crate::library::{
    LibraryActivation, LibraryDefinition, LibraryListener, LibraryProvider, LibraryResolver,
};

// ================================================================================================
// Class Path Containers
// ================================================================================================

/// The container trait and the shared handle type
pub use crate::container::{ContainerRef, ContentContainer};

/// Concrete container implementations
pub use crate::container::{ArchiveContainer, DirectoryContainer, MemoryContainer};

/// Container entries, resources and manifests
pub use crate::container::{ContainerEntry, ContainerKind, Manifest, Resource};
