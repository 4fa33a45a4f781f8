// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'container/archive.rs' uses mmap to map an archive into memory

//! # classgate
//!
//! [![Crates.io](https://img.shields.io/crates/v/classgate.svg)](https://crates.io/crates/classgate)
//! [![Documentation](https://docs.rs/classgate/badge.svg)](https://docs.rs/classgate)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/classgate/blob/main/LICENSE-APACHE)
//!
//! A class loading service for modular application servers. `classgate` builds per
//! application delegation chains out of a system loader, per application gateways,
//! parent-first or parent-last application loaders, lazily resolved shared libraries
//! and a two-tier class transformation pipeline, all safe under concurrent loads.
//!
//! ## Features
//!
//! - **🧭 Configurable delegation** - Parent-first and parent-last chains built from
//!   declarative loader configurations
//! - **🚪 Gateway isolation** - Per application module wiring, dynamic import
//!   filtering and API type visibility
//! - **📚 Shared libraries** - Lazily resolved library loaders with synchronous,
//!   asynchronous and deferred activation
//! - **🔧 Class transformation** - Service-wide and per loader transformers with
//!   cache-aware skipping
//! - **🪞 Shadow loaders** - Fresh class copies for diagnostics without disturbing
//!   running applications
//! - **🛡️ Concurrent by construction** - Lock-free definition tables carry the
//!   same-class guarantee under racing loads
//!
//! ## Quick Start
//!
//! Add `classgate` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! classgate = "0.2"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust
//! use std::sync::Arc;
//! use classgate::prelude::*;
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
//! assert_eq!(class.name(), "platform.Runtime");
//! # Ok::<(), classgate::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `classgate` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`service`] - The owning service that builds, registers and destroys loaders
//! - [`loader`] - The loader hierarchy: system, gateway, application and shadow
//! - [`container`] - Class path containers: archives, directories and in-memory
//! - [`transform`] - The two-tier class transformation pipeline
//! - [`library`] - Shared library definitions, resolution and notification
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### Delegation Chains
//!
//! Every application reaches the platform through the same shape of chain:
//!
//! ```text
//! SystemClassLoader  (platform:system)
//!        ▲
//! GatewayClassLoader (gateway:<application>)
//!        ▲
//! AppClassLoader     (<application>:<qualifier>)     top level
//!        ▲
//! AppClassLoader     (<application>:<qualifier>)     children, optional
//! ```
//!
//! The gateway owns the application's view of the platform: it wires a synthetic
//! module into the module layer, filters packages through declared API types and
//! decides whether unresolved names fall through to the system loader. Application
//! loaders below it resolve their configured class path, shared libraries and
//! generated classes in the configured delegation order.
//!
//! ### Class Definition
//!
//! Bytes found on a class path pass through the transformation pipeline, then
//! through class record validation, then pick up their package record and
//! protection domain, and finally land in the defining loader's lock-free class
//! table. Racing definitions of the same name collapse to one record, every
//! caller receives the same [`loader::LoadedClass`] instance.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result) with comprehensive error information:
//!
//! ```rust,no_run
//! use classgate::Error;
//! # fn example(loader: &dyn classgate::loader::ClassLoader) {
//! match loader.load_class("com.example.Widget") {
//!     Ok(class) => println!("Defined by {}", class.defined_by()),
//!     Err(Error::NotFound { class }) => println!("No loader supplies {class}"),
//!     Err(Error::MalformedClass { class, message, .. }) => {
//!         println!("Bad record for {class}: {message}");
//!     }
//!     Err(e) => println!("Other error: {e}"),
//! }
//! # }
//! ```
//!
//! ## Development and Testing
//!
//! The crate includes fuzzing support for the archive and manifest parsers:
//!
//! ```bash
//! # Install fuzzing tools
//! cargo install cargo-fuzz
//!
//! # Run fuzzers
//! cargo +nightly fuzz run archive --release
//! cargo +nightly fuzz run manifest --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench  # Loading and delegation benchmarks
//! ```
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the classgate library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust
/// use classgate::prelude::*;
///
/// let config = ClassLoaderConfiguration::new(ClassLoaderIdentity::new("inventory", "app"))
///     .with_delegation(DelegationOrder::ParentLast);
/// assert_eq!(config.delegation(), DelegationOrder::ParentLast);
/// ```
pub mod prelude;

/// Class path containers: archives, exploded directories and in-memory content.
///
/// Containers are the supply side of class loading. They answer entry lookups
/// with bytes plus a cached flag, expose their archive manifest for package
/// attribution and render entry URLs for resources.
///
/// # Key Types
///
/// - [`container::ContentContainer`] - The trait every container implements
/// - [`container::ArchiveContainer`] - Memory-mapped stored archives
/// - [`container::DirectoryContainer`] - Exploded directories on disk
/// - [`container::MemoryContainer`] - Mutable in-memory content
/// - [`container::Manifest`] - Parsed archive manifests
pub mod container;

/// Shared library definitions, lazy resolution and availability notification.
///
/// Libraries bind a name to a loader supplied by the embedder's provider. The
/// resolver binds each name at most once and honors the library's activation
/// mode: synchronous libraries resolve on first reference, asynchronous ones on
/// listener registration, deferred ones only on an explicit signal.
pub mod library;

/// The class loader hierarchy: system, gateway, application and shadow loaders.
///
/// # Key Types
///
/// - [`loader::ClassLoader`] - The trait every loader implements
/// - [`loader::SystemClassLoader`] - The platform loader at the root of every chain
/// - [`loader::GatewayClassLoader`] - Per application bridge to the platform
/// - [`loader::AppClassLoader`] - Application loaders with configurable delegation
/// - [`loader::ShadowClassLoader`] - Fresh copies without disturbing the original
/// - [`loader::LoadedClass`] - The immutable record of a defined class
pub mod loader;

/// The owning service composing loaders into delegation chains.
///
/// [`service::ClassLoadingService`] is the entry point of this crate: it owns the
/// registry, the shared library resolver, the system transformer tier and the
/// generator registry, and builds loaders from declarative configurations.
pub mod service;

/// The two-tier class transformation pipeline.
///
/// System transformers are registered once per service and skipped for bytes
/// served from a pre-processed cache, loader transformers always run. See
/// [`transform::ClassTransformer`].
pub mod transform;

/// `classgate` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust,no_run
/// use classgate::{loader::LoadedClassRc, Result};
///
/// fn load(loader: &dyn classgate::loader::ClassLoader) -> Result<LoadedClassRc> {
///     loader.load_class("com.example.Widget")
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `classgate` Error type
///
/// The main error type for all operations in this crate. Provides detailed error
/// information for resolution misses, malformed class records, container parsing
/// and loader lifecycle failures.
///
/// # Examples
///
/// ```rust,no_run
/// use classgate::Error;
/// # fn example(loader: &dyn classgate::loader::ClassLoader) {
/// match loader.load_class("com.example.Widget") {
///     Ok(_) => println!("Loaded successfully"),
///     Err(Error::NotFound { class }) => println!("{class} is not on any class path"),
///     Err(e) => println!("Error: {e}"),
/// }
/// # }
/// ```
pub use error::Error;

/// Main entry point for composing and owning class loaders.
///
/// See [`service::ClassLoadingService`] for creation, registration and
/// destruction of loaders.
pub use service::ClassLoadingService;
