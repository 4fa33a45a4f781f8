//! Archive manifest parsing for package attribution.
//!
//! This module provides the [`crate::container::Manifest`] type, a parser for the
//! `META-INF/MANIFEST.MF` entry carried by archive containers. Manifests drive package
//! attribution: when a loader defines the first class of a package, the specification
//! and implementation attributes for that package are read from the manifest of the
//! supplying archive, including whether the package is sealed to that archive.
//!
//! # Format
//!
//! A manifest is a UTF-8 text file of `Key: Value` attribute lines. Lines longer than
//! the format's wrap limit are continued on the next line with a single leading space,
//! and blank lines separate the main attribute block from named per-entry sections.
//! A per-entry section starts with a `Name` attribute whose value is a path inside the
//! archive, typically a package directory such as `com/example/api/`.
//!
//! Attribute names are matched case-insensitively. Per-entry sections override the
//! main attributes for the entry they name.
//!
//! # Usage Examples
//!
//! ```rust
//! use classgate::container::Manifest;
//!
//! let manifest = Manifest::parse(
//!     b"Manifest-Version: 1.0\n\
//!       Sealed: true\n\
//!       \n\
//!       Name: com/example/api/\n\
//!       Sealed: false\n",
//! )?;
//!
//! assert_eq!(manifest.main_attribute("Manifest-Version"), Some("1.0"));
//!
//! // The named section overrides the main attributes for that package directory.
//! assert!(manifest.package_attributes("com/example/impl/").sealed);
//! assert!(!manifest.package_attributes("com/example/api/").sealed);
//! # Ok::<(), classgate::Error>(())
//! ```

use std::collections::HashMap;

use crate::Result;

/// Attribute names are case-insensitive, keys are normalized to lowercase on insert.
type AttributeMap = HashMap<String, String>;

/// A parsed archive manifest.
///
/// [`crate::container::Manifest`] holds the main attribute block and all named
/// per-entry sections of a `META-INF/MANIFEST.MF` file. Lookups are case-insensitive
/// in the attribute name, section names are matched verbatim since they are archive
/// paths.
///
/// Archive containers parse their manifest once at construction and expose it through
/// [`crate::container::ContentContainer::manifest`], so loaders never re-parse the
/// manifest on the class loading path.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// Main attribute block, keyed by lowercased attribute name
    main: AttributeMap,
    /// Named sections, keyed by the verbatim `Name` value
    sections: HashMap<String, AttributeMap>,
}

/// Package attributes resolved from a manifest for one package directory.
///
/// Produced by [`crate::container::Manifest::package_attributes`]. Each field is the
/// per-section value when the manifest has a section for the package directory,
/// falling back to the main attribute block otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageAttributes {
    /// Value of the `Specification-Title` attribute
    pub spec_title: Option<String>,
    /// Value of the `Specification-Version` attribute
    pub spec_version: Option<String>,
    /// Value of the `Specification-Vendor` attribute
    pub spec_vendor: Option<String>,
    /// Value of the `Implementation-Title` attribute
    pub impl_title: Option<String>,
    /// Value of the `Implementation-Version` attribute
    pub impl_version: Option<String>,
    /// Value of the `Implementation-Vendor` attribute
    pub impl_vendor: Option<String>,
    /// Whether the `Sealed` attribute resolved to `true`
    pub sealed: bool,
}

impl Manifest {
    /// Parse a manifest from its raw bytes.
    ///
    /// Continuation lines are joined onto the attribute they continue, blank lines
    /// close the current block, and both `\n` and `\r\n` line endings are accepted.
    /// The first block becomes the main attributes, every later block must carry a
    /// `Name` attribute and becomes a named section.
    ///
    /// # Arguments
    /// * `data` - Raw bytes of a `META-INF/MANIFEST.MF` entry
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the bytes are not valid UTF-8, if a
    /// continuation line has nothing to continue, if an attribute line has no `:`
    /// separator, or if a section block is missing its `Name` attribute.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use classgate::container::Manifest;
    ///
    /// let manifest = Manifest::parse(b"Implementation-Version: 2.1.0\n")?;
    /// assert_eq!(manifest.main_attribute("implementation-version"), Some("2.1.0"));
    /// # Ok::<(), classgate::Error>(())
    /// ```
    pub fn parse(data: &[u8]) -> Result<Manifest> {
        let Ok(text) = std::str::from_utf8(data) else {
            return Err(malformed_error!("Manifest is not valid UTF-8"));
        };

        let mut blocks: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for raw in text.split('\n') {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.is_empty() {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                continue;
            }

            if let Some(continued) = line.strip_prefix(' ') {
                match current.last_mut() {
                    Some(previous) => previous.push_str(continued),
                    None => {
                        return Err(malformed_error!(
                            "Manifest continuation line without a preceding attribute"
                        ))
                    }
                }
            } else {
                current.push(line.to_string());
            }
        }

        if !current.is_empty() {
            blocks.push(current);
        }

        let mut manifest = Manifest::default();
        for (index, block) in blocks.into_iter().enumerate() {
            let mut attributes = AttributeMap::new();
            for line in &block {
                let (key, value) = Manifest::split_attribute(line)?;
                attributes.insert(key, value);
            }

            if index == 0 {
                manifest.main = attributes;
            } else {
                let Some(name) = attributes.remove("name") else {
                    return Err(malformed_error!(
                        "Manifest section is missing a Name attribute"
                    ));
                };
                manifest.sections.insert(name, attributes);
            }
        }

        Ok(manifest)
    }

    fn split_attribute(line: &str) -> Result<(String, String)> {
        let Some((key, value)) = line.split_once(':') else {
            return Err(malformed_error!(
                "Manifest line has no attribute separator - '{}'",
                line
            ));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(malformed_error!(
                "Manifest line has an empty attribute name - '{}'",
                line
            ));
        }

        Ok((key.to_ascii_lowercase(), value.trim().to_string()))
    }

    /// Look up an attribute in the main block.
    ///
    /// # Arguments
    /// * `name` - Attribute name, matched case-insensitively
    pub fn main_attribute(&self, name: &str) -> Option<&str> {
        self.main
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Look up an attribute in a named section.
    ///
    /// Returns `None` when either the section or the attribute is absent, without
    /// falling back to the main block. Use
    /// [`crate::container::Manifest::package_attributes`] for the resolution rules
    /// that package definition applies.
    ///
    /// # Arguments
    /// * `section` - The verbatim `Name` value of the section
    /// * `name` - Attribute name, matched case-insensitively
    pub fn section_attribute(&self, section: &str, name: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the manifest carries a section for the given name.
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Resolve the package attributes for one package directory.
    ///
    /// Each attribute is taken from the section named after the directory when that
    /// section defines it, and from the main block otherwise. The `Sealed` attribute
    /// resolves to `true` only for the exact value `true`, compared case-insensitively.
    ///
    /// # Arguments
    /// * `directory` - Package directory inside the archive, such as `com/example/api/`
    pub fn package_attributes(&self, directory: &str) -> PackageAttributes {
        let resolve = |name: &str| {
            self.section_attribute(directory, name)
                .or_else(|| self.main_attribute(name))
                .map(str::to_string)
        };

        PackageAttributes {
            spec_title: resolve("Specification-Title"),
            spec_version: resolve("Specification-Version"),
            spec_vendor: resolve("Specification-Vendor"),
            impl_title: resolve("Implementation-Title"),
            impl_version: resolve("Implementation-Version"),
            impl_vendor: resolve("Implementation-Vendor"),
            sealed: resolve("Sealed").is_some_and(|value| value.eq_ignore_ascii_case("true")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_attributes() {
        let manifest = Manifest::parse(
            b"Manifest-Version: 1.0\nImplementation-Title: widgets\nImplementation-Version: 3.4\n",
        )
        .unwrap();

        assert_eq!(manifest.main_attribute("Manifest-Version"), Some("1.0"));
        assert_eq!(
            manifest.main_attribute("implementation-title"),
            Some("widgets")
        );
        assert_eq!(
            manifest.main_attribute("IMPLEMENTATION-VERSION"),
            Some("3.4")
        );
        assert_eq!(manifest.main_attribute("Sealed"), None);
    }

    #[test]
    fn continuation_lines_join() {
        let manifest = Manifest::parse(
            b"Implementation-Title: a very long implementat\n ion title that wraps\n",
        )
        .unwrap();

        assert_eq!(
            manifest.main_attribute("Implementation-Title"),
            Some("a very long implementation title that wraps")
        );
    }

    #[test]
    fn crlf_line_endings() {
        let manifest =
            Manifest::parse(b"Manifest-Version: 1.0\r\nSealed: true\r\n\r\nName: a/b/\r\nSealed: false\r\n")
                .unwrap();

        assert_eq!(manifest.main_attribute("Manifest-Version"), Some("1.0"));
        assert!(manifest.has_section("a/b/"));
        assert_eq!(manifest.section_attribute("a/b/", "Sealed"), Some("false"));
    }

    #[test]
    fn sections_override_main() {
        let manifest = Manifest::parse(
            b"Sealed: true\nImplementation-Version: 1.0\n\nName: com/example/api/\nSealed: false\nImplementation-Version: 2.0\n",
        )
        .unwrap();

        let api = manifest.package_attributes("com/example/api/");
        assert!(!api.sealed);
        assert_eq!(api.impl_version.as_deref(), Some("2.0"));

        let other = manifest.package_attributes("com/example/impl/");
        assert!(other.sealed);
        assert_eq!(other.impl_version.as_deref(), Some("1.0"));
    }

    #[test]
    fn sealed_requires_true() {
        let manifest = Manifest::parse(b"Sealed: TRUE\n\nName: x/\nSealed: yes\n").unwrap();

        assert!(manifest.package_attributes("y/").sealed);
        assert!(!manifest.package_attributes("x/").sealed);
    }

    #[test]
    fn empty_manifest() {
        let manifest = Manifest::parse(b"").unwrap();
        assert_eq!(manifest.main_attribute("Manifest-Version"), None);
        assert_eq!(
            manifest.package_attributes("a/b/"),
            PackageAttributes::default()
        );
    }

    #[test]
    fn missing_separator_is_malformed() {
        let result = Manifest::parse(b"Manifest-Version 1.0\n");
        assert!(matches!(
            result.unwrap_err(),
            crate::Error::Malformed { .. }
        ));
    }

    #[test]
    fn dangling_continuation_is_malformed() {
        let result = Manifest::parse(b" starts with a continuation\n");
        assert!(matches!(
            result.unwrap_err(),
            crate::Error::Malformed { .. }
        ));
    }

    #[test]
    fn section_without_name_is_malformed() {
        let result = Manifest::parse(b"Manifest-Version: 1.0\n\nSealed: true\n");
        assert!(matches!(
            result.unwrap_err(),
            crate::Error::Malformed { .. }
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let result = Manifest::parse(&[0x4D, 0xFF, 0xFE, 0x0A]);
        assert!(matches!(
            result.unwrap_err(),
            crate::Error::Malformed { .. }
        ));
    }
}
