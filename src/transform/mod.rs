//! The class transformation pipeline.
//!
//! Between finding a class record and defining the class, an application loader runs
//! the bytes through its transformation pipeline. The pipeline has two tiers:
//!
//! - **System transformers** are registered once on the owning service and apply to
//!   every loader it creates. Their output is baked into the platform's class cache,
//!   so they are skipped for bytes served from a cache unless the beta edition
//!   override forces a re-run.
//! - **Loader transformers** are registered on an individual loader and always run,
//!   after the system tier, whatever the cache said.
//!
//! Within a tier, transformers run in registration order and each one sees the
//! previous one's output. Returning `Ok(None)` passes the bytes through untouched,
//! which keeps no-op instrumentation agents cheap. Any error aborts the load, a
//! broken transformer must not let an untransformed class slip through.
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::{loader::ByteResourceInformation, transform::ClassTransformer, Result};
//!
//! /// Stamps a marker byte onto every class of one package.
//! struct Stamper;
//!
//! impl ClassTransformer for Stamper {
//!     fn transform(
//!         &self,
//!         class_name: &str,
//!         bytes: &[u8],
//!         _info: &ByteResourceInformation,
//!     ) -> Result<Option<Vec<u8>>> {
//!         if !class_name.starts_with("com.example.") {
//!             return Ok(None);
//!         }
//!         let mut rewritten = bytes.to_vec();
//!         rewritten.push(0x7F);
//!         Ok(Some(rewritten))
//!     }
//! }
//! ```

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::{loader::ByteResourceInformation, service::GlobalConfig, Error, Result};

/// A rewriter of class records, invoked before classes are defined.
///
/// Implementations must be thread safe, one transformer instance serves concurrent
/// loads from many loaders.
pub trait ClassTransformer: Send + Sync {
    /// Rewrite a class record, or decline.
    ///
    /// The `bytes` argument is the output of the previous transformer in the
    /// pipeline, the `info` record carries the original provenance including
    /// access to the untransformed bytes.
    ///
    /// Returns `Ok(Some(bytes))` with the replacement record, or `Ok(None)` to pass
    /// the input through unchanged.
    ///
    /// # Arguments
    /// * `class_name` - Dot-separated binary name being defined
    /// * `bytes` - Current record bytes, after earlier transformers
    /// * `info` - Provenance of the found class record
    ///
    /// # Errors
    /// Any error aborts the load of this class.
    fn transform(
        &self,
        class_name: &str,
        bytes: &[u8],
        info: &ByteResourceInformation,
    ) -> Result<Option<Vec<u8>>>;
}

/// An ordered, concurrently mutable list of transformers.
///
/// Used for both pipeline tiers. Mutation takes a write lock, the load path clones
/// a snapshot under a read lock so a transformer can itself trigger class loads
/// without deadlocking, and so in-flight loads are unaffected by concurrent
/// registration.
#[derive(Default)]
pub struct TransformerList {
    /// Registered transformers in registration order
    transformers: RwLock<Vec<Arc<dyn ClassTransformer>>>,
}

impl TransformerList {
    /// Create an empty list.
    pub fn new() -> TransformerList {
        TransformerList {
            transformers: RwLock::new(Vec::new()),
        }
    }

    /// Append a transformer to the end of the run order.
    pub fn add(&self, transformer: Arc<dyn ClassTransformer>) {
        write_lock!(self.transformers).push(transformer);
    }

    /// Remove a previously added transformer.
    ///
    /// Matches by instance identity and reports whether anything was removed.
    /// Loads already holding a snapshot still run the removed transformer once.
    pub fn remove(&self, transformer: &Arc<dyn ClassTransformer>) -> bool {
        let mut transformers = write_lock!(self.transformers);
        match transformers
            .iter()
            .position(|registered| Arc::ptr_eq(registered, transformer))
        {
            Some(index) => {
                transformers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered transformers.
    pub fn len(&self) -> usize {
        read_lock!(self.transformers).len()
    }

    /// Whether no transformers are registered.
    pub fn is_empty(&self) -> bool {
        read_lock!(self.transformers).is_empty()
    }

    /// Clone the current run order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<dyn ClassTransformer>> {
        read_lock!(self.transformers).clone()
    }
}

/// The two-tier transformation pipeline of one application loader.
///
/// The system tier is shared with every other loader of the same owning service,
/// the loader tier belongs to this pipeline alone.
pub struct TransformerPipeline {
    /// Service-wide transformers, shared between loaders
    system: Arc<TransformerList>,
    /// Transformers registered on this loader only
    local: TransformerList,
    /// Service-wide settings, carries the beta edition override
    global: Arc<GlobalConfig>,
}

impl TransformerPipeline {
    pub(crate) fn new(system: Arc<TransformerList>, global: Arc<GlobalConfig>) -> TransformerPipeline {
        TransformerPipeline {
            system,
            local: TransformerList::new(),
            global,
        }
    }

    /// Register a transformer on the loader tier.
    pub fn add_transformer(&self, transformer: Arc<dyn ClassTransformer>) {
        self.local.add(transformer);
    }

    /// Remove a transformer from the loader tier, reporting whether it was present.
    pub fn remove_transformer(&self, transformer: &Arc<dyn ClassTransformer>) -> bool {
        self.local.remove(transformer)
    }

    /// Run a found class record through both tiers.
    ///
    /// System transformers are skipped for cache-served bytes unless the beta
    /// edition override is active. Loader transformers always run.
    ///
    /// # Arguments
    /// * `class_name` - Dot-separated binary name being defined
    /// * `info` - The found class record with its provenance
    ///
    /// # Errors
    /// Returns [`crate::Error::Transformer`] wrapping the first failure.
    pub fn transform(&self, class_name: &str, info: &ByteResourceInformation) -> Result<Vec<u8>> {
        let mut bytes = info.bytes().to_vec();

        if !info.from_cache() || self.global.beta_edition() {
            bytes = TransformerPipeline::run(&self.system.snapshot(), class_name, bytes, info)?;
        }

        TransformerPipeline::run(&self.local.snapshot(), class_name, bytes, info)
    }

    fn run(
        transformers: &[Arc<dyn ClassTransformer>],
        class_name: &str,
        mut bytes: Vec<u8>,
        info: &ByteResourceInformation,
    ) -> Result<Vec<u8>> {
        for transformer in transformers {
            match transformer.transform(class_name, &bytes, info) {
                Ok(Some(rewritten)) => {
                    debug!(
                        "Transformer rewrote {class_name} - {} bytes in, {} bytes out",
                        bytes.len(),
                        rewritten.len()
                    );
                    bytes = rewritten;
                }
                Ok(None) => {}
                Err(source) => {
                    return Err(Error::Transformer {
                        class: class_name.to_string(),
                        source: Box::new(source),
                    })
                }
            }
        }

        Ok(bytes)
    }
}
