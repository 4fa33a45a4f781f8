//! Providers for generated classes.
//!
//! Some classes never exist on any class path: they were produced by a provider
//! that has since been deregistered, and the platform keeps serving them from its
//! generated-classes cache. A [`crate::loader::ClassGenerator`] is the hook into
//! that cache. Application loaders consult the registered generators as the last
//! step of local resolution, but only when their configuration opts in.
//!
//! A generated class is defined by the consulting loader like any other local
//! class, so repeated loads return the cached definition without invoking the
//! generator again.

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::{loader::ClassLoader, Result};

/// A provider of class records for names no class path can supply.
///
/// Generators are consulted in registration order, the first one returning bytes
/// wins. Returning `Ok(None)` passes the name to the next generator.
pub trait ClassGenerator: Send + Sync {
    /// Produce the class record for a name, or `None` when this generator does not
    /// recognize it.
    ///
    /// # Arguments
    /// * `class_name` - Dot-separated binary name being resolved
    /// * `loader` - The loader that will define the generated class
    ///
    /// # Errors
    /// Any error fails the load attempt, it does not fall through to other
    /// generators or loaders.
    fn generate_class(&self, class_name: &str, loader: &dyn ClassLoader)
        -> Result<Option<Vec<u8>>>;
}

/// The shared registry of class generators.
///
/// One registry serves all loaders created by an owning service. Registration and
/// removal are cheap, the lookup path clones a snapshot of the generator list so
/// generators can themselves trigger class loads without deadlocking.
#[derive(Default)]
pub struct GeneratorRegistry {
    /// Registered generators in registration order
    generators: RwLock<Vec<Arc<dyn ClassGenerator>>>,
}

impl GeneratorRegistry {
    /// Create an empty registry.
    pub fn new() -> GeneratorRegistry {
        GeneratorRegistry {
            generators: RwLock::new(Vec::new()),
        }
    }

    /// Register a generator at the end of the consultation order.
    pub fn add(&self, generator: Arc<dyn ClassGenerator>) {
        write_lock!(self.generators).push(generator);
    }

    /// Remove a previously registered generator.
    ///
    /// Matches by instance identity and reports whether anything was removed.
    /// Loads already holding a snapshot still complete with the old generator.
    pub fn remove(&self, generator: &Arc<dyn ClassGenerator>) -> bool {
        let mut generators = write_lock!(self.generators);
        match generators
            .iter()
            .position(|registered| Arc::ptr_eq(registered, generator))
        {
            Some(index) => {
                generators.remove(index);
                true
            }
            None => false,
        }
    }

    /// Whether no generators are registered.
    pub fn is_empty(&self) -> bool {
        read_lock!(self.generators).is_empty()
    }

    /// Ask the registered generators for a class record.
    pub(crate) fn generate(
        &self,
        class_name: &str,
        loader: &dyn ClassLoader,
    ) -> Result<Option<Vec<u8>>> {
        let snapshot: Vec<Arc<dyn ClassGenerator>> = read_lock!(self.generators).clone();

        for generator in snapshot {
            if let Some(bytes) = generator.generate_class(class_name, loader)? {
                debug!(
                    "Generated {} bytes for class {class_name} on behalf of {}",
                    bytes.len(),
                    loader.identity()
                );
                return Ok(Some(bytes));
            }
        }

        Ok(None)
    }
}
