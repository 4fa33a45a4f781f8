//! API type visibility for platform packages.
//!
//! Platform packages are classified into API types, and every application declares
//! which of those types it is allowed to see. The gateway loader applies this gate:
//! before resolving a class or resource it checks the package against the
//! [`crate::loader::ApiAccess`] declarations, and a package whose classification has
//! no overlap with the application's declared visibility is unreachable through that
//! gateway regardless of what the platform class path contains.
//!
//! Undeclared packages are unrestricted. The gate only constrains packages an
//! operator has explicitly classified.
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::loader::{ApiAccess, ApiType, ApiTypes};
//!
//! let mut access = ApiAccess::new();
//! access.declare("com.acme.kernel", ApiTypes::PLATFORM);
//! access.declare("com.acme.kernel.api", ApiTypes::API | ApiTypes::STABLE);
//!
//! // The most specific declaration wins.
//! assert!(!ApiTypes::API.intersects(ApiTypes::PLATFORM));
//! assert!(access.permits("com.acme.kernel.api.widgets", ApiTypes::API));
//! assert!(!access.permits("com.acme.kernel.internal", ApiTypes::API));
//!
//! // Undeclared packages pass any visibility.
//! assert!(access.permits("org.example", ApiTypes::empty()));
//! # assert_eq!("third-party".parse::<ApiType>().unwrap(), ApiType::ThirdParty);
//! ```

use strum::{Display, EnumIter, EnumString};

use crate::Result;

/// Classification of a platform package.
///
/// The string form of each type is its kebab-case name, which is also what
/// [`crate::loader::ApiTypes::parse`] accepts in visibility lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ApiType {
    /// Specification API implemented by the platform
    Spec,
    /// Platform internals, visible only to trusted applications
    Platform,
    /// Supported platform API
    Api,
    /// Bundled third party API
    ThirdParty,
    /// API in incubation that has been declared stable
    Stable,
}

bitflags::bitflags! {
    /// A set of [`crate::loader::ApiType`] values.
    ///
    /// Used in two roles: the classification of a package, and the visibility an
    /// application declares. A package is visible when the two sets intersect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ApiTypes: u8 {
        /// Specification API implemented by the platform
        const SPEC = 0x01;
        /// Platform internals, visible only to trusted applications
        const PLATFORM = 0x02;
        /// Supported platform API
        const API = 0x04;
        /// Bundled third party API
        const THIRD_PARTY = 0x08;
        /// API in incubation that has been declared stable
        const STABLE = 0x10;
    }
}

impl From<ApiType> for ApiTypes {
    fn from(value: ApiType) -> ApiTypes {
        match value {
            ApiType::Spec => ApiTypes::SPEC,
            ApiType::Platform => ApiTypes::PLATFORM,
            ApiType::Api => ApiTypes::API,
            ApiType::ThirdParty => ApiTypes::THIRD_PARTY,
            ApiType::Stable => ApiTypes::STABLE,
        }
    }
}

impl ApiTypes {
    /// Parse a comma separated visibility list such as `spec, api, third-party`.
    ///
    /// Entries are trimmed and matched against the kebab-case names of
    /// [`crate::loader::ApiType`]. An empty string parses to the empty set.
    ///
    /// # Arguments
    /// * `list` - Comma separated API type names
    ///
    /// # Errors
    /// Returns [`crate::Error::Error`] when the list names an unknown API type.
    pub fn parse(list: &str) -> Result<ApiTypes> {
        let mut types = ApiTypes::empty();
        for raw in list.split(',') {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }

            let Ok(api_type) = name.parse::<ApiType>() else {
                return Err(crate::Error::Error(format!(
                    "Unknown API type '{name}' in visibility list '{list}'"
                )));
            };
            types |= api_type.into();
        }

        Ok(types)
    }
}

/// Package prefix declarations gating platform package visibility.
///
/// Declarations map a package prefix to the [`crate::loader::ApiTypes`]
/// classification of everything under it. A prefix covers the package itself and all
/// of its subpackages, and when several prefixes cover the same package the longest
/// one decides.
#[derive(Debug, Clone, Default)]
pub struct ApiAccess {
    /// Declared prefixes with their classification
    declarations: Vec<(String, ApiTypes)>,
}

impl ApiAccess {
    /// Create an empty declaration set, under which every package is unrestricted.
    pub fn new() -> ApiAccess {
        ApiAccess {
            declarations: Vec::new(),
        }
    }

    /// Declare the classification of a package prefix.
    ///
    /// # Arguments
    /// * `prefix` - Package prefix, covering itself and all subpackages
    /// * `types` - Classification of the covered packages
    pub fn declare(&mut self, prefix: impl Into<String>, types: ApiTypes) {
        self.declarations.push((prefix.into(), types));
    }

    /// The classification covering a package, when one is declared.
    ///
    /// # Arguments
    /// * `package` - Dot-separated package name
    pub fn classification(&self, package: &str) -> Option<ApiTypes> {
        self.declarations
            .iter()
            .filter(|(prefix, _)| ApiAccess::covers(prefix, package))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, types)| *types)
    }

    /// Whether a package is visible under the given declared visibility.
    ///
    /// Returns `true` for undeclared packages, and otherwise requires the package's
    /// classification to intersect the visibility.
    ///
    /// # Arguments
    /// * `package` - Dot-separated package name
    /// * `visibility` - API types the requesting application declared
    pub fn permits(&self, package: &str, visibility: ApiTypes) -> bool {
        match self.classification(package) {
            Some(types) => visibility.intersects(types),
            None => true,
        }
    }

    /// Number of declared prefixes.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether no prefixes are declared.
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    fn covers(prefix: &str, package: &str) -> bool {
        if package == prefix {
            return true;
        }

        package.len() > prefix.len()
            && package.starts_with(prefix)
            && package.as_bytes()[prefix.len()] == b'.'
    }
}
