//! Lazily resolved shared libraries.
//!
//! Shared libraries are class providers that applications reference by name. A
//! library may not be available when a loader referencing it is built, so loaders
//! hold only the name and ask the [`crate::library::LibraryResolver`] at class
//! loading time. Once a name resolves to a provider loader, that binding is stable
//! for the life of the resolver, later provider changes do not rebind it.
//!
//! Libraries arrive in three ways, declared per library by the provider:
//!
//! - **Synchronous** libraries resolve on first reference, a class load that needs
//!   the library binds it on the spot.
//! - **Asynchronous** libraries resolve when a listener registers for them, the
//!   listener is notified before registration returns.
//! - **Deferred** libraries resolve only when an explicit arrival signal names
//!   them, listener registration just stores the listener.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! let resolver = LibraryResolver::new(provider);
//!
//! // A synchronous library binds on first use.
//! let commons = resolver.get_library("commons").unwrap();
//!
//! // A deferred library stays unavailable until signalled.
//! assert!(resolver.get_library("plugins").is_none());
//! resolver.notify_library_available("plugins");
//! assert!(resolver.get_library("plugins").is_some());
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::loader::LoaderRef;

/// When a shared library becomes available to its referencing loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum LibraryActivation {
    /// Resolves on first reference from a class load
    Synchronous,
    /// Resolves when a listener registers for it
    Asynchronous,
    /// Resolves only on an explicit arrival signal
    Deferred,
}

/// A provider's answer for one shared library name.
#[derive(Clone)]
pub struct LibraryDefinition {
    /// Loader serving the library's classes
    pub loader: LoaderRef,
    /// How the library becomes available
    pub activation: LibraryActivation,
}

impl LibraryDefinition {
    /// Pair a provider loader with its activation mode.
    pub fn new(loader: LoaderRef, activation: LibraryActivation) -> LibraryDefinition {
        LibraryDefinition { loader, activation }
    }
}

/// The source of shared library definitions.
///
/// Implemented by the embedder, typically over its configuration registry. The
/// resolver calls `lookup` every time an unresolved name is referenced, so
/// providers may answer `None` now and `Some` later as libraries get installed.
pub trait LibraryProvider: Send + Sync {
    /// The current definition for a library name, if one exists.
    fn lookup(&self, name: &str) -> Option<LibraryDefinition>;
}

/// A callback observing shared library arrivals.
pub trait LibraryListener: Send + Sync {
    /// Invoked when the named library has resolved to a provider loader.
    fn library_notification(&self, name: &str, loader: &LoaderRef);
}

/// The shared library resolver of an owning service.
///
/// Tracks which names have resolved to which provider loaders and drives arrival
/// notifications. One resolver is shared by every loader the service creates,
/// which is what makes bindings service-wide: the first resolution of a name wins
/// for all referencing loaders.
pub struct LibraryResolver {
    /// Source of library definitions
    provider: Arc<dyn LibraryProvider>,
    /// Names that have resolved, with their bound loader
    resolved: DashMap<String, LoaderRef>,
    /// Registered listeners per library name
    listeners: DashMap<String, Vec<Arc<dyn LibraryListener>>>,
}

impl LibraryResolver {
    /// Create a resolver over a definition provider.
    pub fn new(provider: Arc<dyn LibraryProvider>) -> LibraryResolver {
        LibraryResolver {
            provider,
            resolved: DashMap::new(),
            listeners: DashMap::new(),
        }
    }

    /// The loader serving a library, resolving synchronous libraries on demand.
    ///
    /// Already resolved names answer regardless of their activation mode.
    /// Unresolved names resolve here only when the provider declares them
    /// synchronous, asynchronous and deferred libraries stay unavailable and the
    /// caller treats the library as absent.
    ///
    /// # Arguments
    /// * `name` - Shared library name
    pub fn get_library(&self, name: &str) -> Option<LoaderRef> {
        if let Some(resolved) = self.resolved.get(name) {
            return Some(resolved.value().clone());
        }

        match self.provider.lookup(name) {
            Some(definition) if definition.activation == LibraryActivation::Synchronous => {
                Some(self.resolve(name, definition.loader))
            }
            _ => None,
        }
    }

    /// Register a listener for a library's arrival.
    ///
    /// For an already resolved library the listener is notified before this call
    /// returns. For an unresolved synchronous or asynchronous library, registration
    /// itself resolves the library and notifies the new listener. For a deferred
    /// library the listener is only stored, resolution waits for
    /// [`crate::library::LibraryResolver::notify_library_available`].
    ///
    /// # Arguments
    /// * `name` - Shared library name
    /// * `listener` - Callback to notify on arrival
    pub fn register_library_change_listener(
        &self,
        name: &str,
        listener: Arc<dyn LibraryListener>,
    ) {
        self.listeners
            .entry(name.to_string())
            .or_default()
            .push(listener.clone());

        if let Some(resolved) = self.resolved.get(name).map(|r| r.value().clone()) {
            listener.library_notification(name, &resolved);
            return;
        }

        if let Some(definition) = self.provider.lookup(name) {
            match definition.activation {
                LibraryActivation::Synchronous | LibraryActivation::Asynchronous => {
                    let loader = self.resolve(name, definition.loader);
                    listener.library_notification(name, &loader);
                }
                LibraryActivation::Deferred => {}
            }
        }
    }

    /// Signal that a library has arrived, resolving it and notifying listeners.
    ///
    /// This is the trigger for deferred libraries, though signalling any known
    /// library resolves it. Every listener registered for the name is notified with
    /// the bound loader. Returns `false` when the provider knows nothing under the
    /// name, in which case nobody is notified.
    ///
    /// # Arguments
    /// * `name` - Shared library name
    pub fn notify_library_available(&self, name: &str) -> bool {
        let loader = if let Some(resolved) = self.resolved.get(name) {
            resolved.value().clone()
        } else {
            match self.provider.lookup(name) {
                Some(definition) => self.resolve(name, definition.loader),
                None => return false,
            }
        };

        let snapshot: Vec<Arc<dyn LibraryListener>> = self
            .listeners
            .get(name)
            .map(|listeners| listeners.value().clone())
            .unwrap_or_default();

        for listener in snapshot {
            listener.library_notification(name, &loader);
        }

        true
    }

    /// Whether a library name has already resolved.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains_key(name)
    }

    /// Bind a name to a loader, keeping an existing binding.
    fn resolve(&self, name: &str, loader: LoaderRef) -> LoaderRef {
        self.resolved
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("Shared library {name} resolved");
                loader
            })
            .value()
            .clone()
    }
}
