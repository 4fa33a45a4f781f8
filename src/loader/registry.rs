//! The registry of live application class loaders.
//!
//! Every loader an owning service creates is registered here under its identity,
//! which is how child loader configurations find their parent and how the service
//! destroys loaders when applications stop. Identities are unique: registration is
//! atomic and the first loader under a name wins, concurrent creation of the same
//! identity leaves exactly one registered loader.
//!
//! Deregistration removes the loader from the registry only. References held
//! elsewhere, such as a child loader's parent edge, keep the loader alive and
//! functional until they are dropped.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::debug;

use crate::{
    loader::{AppClassLoader, ClassLoader, ClassLoaderIdentity},
    Result,
};

/// The identity-keyed table of live application loaders.
#[derive(Default)]
pub struct ClassLoaderRegistry {
    /// Registered loaders by identity
    loaders: DashMap<ClassLoaderIdentity, Arc<AppClassLoader>>,
}

impl ClassLoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> ClassLoaderRegistry {
        ClassLoaderRegistry {
            loaders: DashMap::new(),
        }
    }

    /// Register a loader under its identity.
    ///
    /// # Errors
    /// Returns [`crate::Error::DuplicateIdentity`] when a loader with the same
    /// identity is already registered. The registry is unchanged in that case.
    pub fn register(&self, loader: Arc<AppClassLoader>) -> Result<()> {
        match self.loaders.entry(loader.identity().clone()) {
            Entry::Occupied(_) => Err(crate::Error::DuplicateIdentity(loader.identity().clone())),
            Entry::Vacant(slot) => {
                debug!("Registered class loader {}", loader.identity());
                slot.insert(loader);
                Ok(())
            }
        }
    }

    /// The registered loader with the given identity.
    pub fn get(&self, id: &ClassLoaderIdentity) -> Option<Arc<AppClassLoader>> {
        self.loaders.get(id).map(|entry| entry.value().clone())
    }

    /// Remove and return the loader registered under an identity.
    pub fn deregister(&self, id: &ClassLoaderIdentity) -> Option<Arc<AppClassLoader>> {
        let removed = self.loaders.remove(id).map(|(_, loader)| loader);
        if removed.is_some() {
            debug!("Deregistered class loader {id}");
        }
        removed
    }

    /// Identities of all registered loaders.
    pub fn identities(&self) -> Vec<ClassLoaderIdentity> {
        self.loaders.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered loaders.
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no loaders are registered.
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}
