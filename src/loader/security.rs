//! Protection domains and code sources for defined classes.
//!
//! Every defined class carries a [`crate::loader::ProtectionDomain`] naming where its
//! bytes came from and which permissions its loader's configuration grants. Domains
//! are interned per physical location inside each loader, so all classes defined from
//! the same container share one domain instance.

use std::sync::Arc;

use dashmap::DashMap;

/// A reference to a shared protection domain.
pub type ProtectionDomainRc = Arc<ProtectionDomain>;

/// Domain table of a loader, keyed by code source location.
pub(crate) type DomainMap = DashMap<String, ProtectionDomainRc>;

/// A set of named permissions granted to classes of a protection domain.
///
/// Permissions are opaque strings to this crate, enforcement is the embedder's
/// concern. A loader configuration optionally carries a permission set that every
/// domain created by that loader inherits, the default is the empty set.
///
/// # Examples
///
/// ```rust
/// use classgate::loader::Permissions;
///
/// let permissions = Permissions::new()
///     .grant("read:/srv/app/data")
///     .grant("connect:db.internal:5432");
///
/// assert!(permissions.contains("read:/srv/app/data"));
/// assert_eq!(permissions.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Granted permission strings in declaration order
    grants: Vec<String>,
}

impl Permissions {
    /// Create an empty permission set.
    pub fn new() -> Permissions {
        Permissions { grants: Vec::new() }
    }

    /// Add a granted permission.
    ///
    /// # Arguments
    /// * `permission` - Opaque permission string to grant
    #[must_use]
    pub fn grant(mut self, permission: impl Into<String>) -> Permissions {
        self.grants.push(permission.into());
        self
    }

    /// Whether the exact permission string has been granted.
    pub fn contains(&self, permission: &str) -> bool {
        self.grants.iter().any(|grant| grant == permission)
    }

    /// Iterate the granted permission strings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.grants.iter().map(String::as_str)
    }

    /// Number of granted permissions.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether no permissions are granted.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// The origin of a defined class, the physical location of its supplying container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSource {
    /// Physical location the class bytes came from
    location: String,
}

impl CodeSource {
    /// Create a code source for a physical location.
    ///
    /// # Arguments
    /// * `location` - Physical location of the supplying container
    pub fn new(location: impl Into<String>) -> CodeSource {
        CodeSource {
            location: location.into(),
        }
    }

    /// Physical location the class bytes came from.
    pub fn location(&self) -> &str {
        &self.location
    }
}

/// The protection domain of a defined class.
///
/// Pairs the code source with the permissions granted by the defining loader's
/// configuration. Within one loader all classes whose bytes came from the same
/// physical location share a single domain instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionDomain {
    /// Where the class bytes came from
    code_source: CodeSource,
    /// Permissions granted to classes of this domain
    permissions: Permissions,
}

impl ProtectionDomain {
    /// Create a protection domain from its code source and permissions.
    pub fn new(code_source: CodeSource, permissions: Permissions) -> ProtectionDomain {
        ProtectionDomain {
            code_source,
            permissions,
        }
    }

    /// Where the class bytes came from.
    pub fn code_source(&self) -> &CodeSource {
        &self.code_source
    }

    /// Permissions granted to classes of this domain.
    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }
}

/// Intern the domain for a code source location, creating it on first use.
///
/// The template permissions come from the loader configuration and apply to every
/// domain the loader creates. Interning is atomic, concurrent definers of classes
/// from the same location agree on one domain instance.
pub(crate) fn domain_for(
    map: &DomainMap,
    location: &str,
    template: Option<&Permissions>,
) -> ProtectionDomainRc {
    if let Some(existing) = map.get(location) {
        return existing.value().clone();
    }

    map.entry(location.to_string())
        .or_insert_with(|| {
            Arc::new(ProtectionDomain::new(
                CodeSource::new(location),
                template.cloned().unwrap_or_default(),
            ))
        })
        .value()
        .clone()
}
