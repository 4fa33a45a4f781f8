//! Class loader identities.
//!
//! Every loader in the hierarchy is named by a [`crate::loader::ClassLoaderIdentity`],
//! a pair of application name and qualifier. Identities key the loader registry, name
//! loaders in diagnostics and tag every defined class with its defining loader, so
//! they are cheap to clone and hash.

use std::fmt;

/// The unique name of a class loader within a registry.
///
/// An identity pairs the owning application with a qualifier distinguishing the
/// loaders of that application, such as the top level loader, a child or a shadow.
/// Two loaders with equal identities are the same loader as far as the registry is
/// concerned, registration enforces uniqueness.
///
/// # Examples
///
/// ```rust
/// use classgate::loader::ClassLoaderIdentity;
///
/// let id = ClassLoaderIdentity::new("inventory", "app");
/// assert_eq!(id.to_string(), "inventory:app");
/// assert_eq!(id.shadow().to_string(), "inventory:app-shadow");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassLoaderIdentity {
    /// Name of the owning application
    application: String,
    /// Qualifier distinguishing this loader within the application
    qualifier: String,
}

impl ClassLoaderIdentity {
    /// Create an identity from its application name and qualifier.
    ///
    /// # Arguments
    /// * `application` - Name of the owning application
    /// * `qualifier` - Qualifier within that application
    pub fn new(
        application: impl Into<String>,
        qualifier: impl Into<String>,
    ) -> ClassLoaderIdentity {
        ClassLoaderIdentity {
            application: application.into(),
            qualifier: qualifier.into(),
        }
    }

    /// Name of the owning application.
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Qualifier distinguishing this loader within the application.
    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    /// Derive the identity of a shadow loader for this identity.
    ///
    /// Shadow loaders re-run an existing loader's resolution under their own name,
    /// their identity is the surrogate's with a `-shadow` suffix on the qualifier.
    pub fn shadow(&self) -> ClassLoaderIdentity {
        ClassLoaderIdentity {
            application: self.application.clone(),
            qualifier: format!("{}-shadow", self.qualifier),
        }
    }
}

impl fmt::Display for ClassLoaderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.application, self.qualifier)
    }
}
