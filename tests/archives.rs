//! Integration tests for loading classes out of real stored archives.
//!
//! These tests assemble raw archive bytes, index them through
//! [`classgate::container::ArchiveContainer`] and serve classes and resources
//! from them through a full delegation chain.

use std::sync::Arc;

use classgate::prelude::*;

struct NoLibraries;

impl LibraryProvider for NoLibraries {
    fn lookup(&self, _name: &str) -> Option<LibraryDefinition> {
        None
    }
}

fn class_bytes(payload: &str) -> Vec<u8> {
    let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

// Writes a stored-only archive: local records, central directory, end record.
fn build_stored_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut jar = Vec::new();
    let mut central = Vec::new();

    for (name, data) in entries {
        let offset = jar.len() as u32;
        let name_bytes = name.as_bytes();
        let size = data.len() as u32;

        jar.extend_from_slice(&0x0403_4B50u32.to_le_bytes());
        jar.extend_from_slice(&20u16.to_le_bytes()); // version needed
        jar.extend_from_slice(&0u16.to_le_bytes()); // flags
        jar.extend_from_slice(&0u16.to_le_bytes()); // method: stored
        jar.extend_from_slice(&0u16.to_le_bytes()); // time
        jar.extend_from_slice(&0u16.to_le_bytes()); // date
        jar.extend_from_slice(&0u32.to_le_bytes()); // crc
        jar.extend_from_slice(&size.to_le_bytes());
        jar.extend_from_slice(&size.to_le_bytes());
        jar.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        jar.extend_from_slice(&0u16.to_le_bytes()); // extra len
        jar.extend_from_slice(name_bytes);
        jar.extend_from_slice(data);

        central.extend_from_slice(&0x0201_4B50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes()); // version made by
        central.extend_from_slice(&20u16.to_le_bytes()); // version needed
        central.extend_from_slice(&0u16.to_le_bytes()); // flags
        central.extend_from_slice(&0u16.to_le_bytes()); // method: stored
        central.extend_from_slice(&0u16.to_le_bytes()); // time
        central.extend_from_slice(&0u16.to_le_bytes()); // date
        central.extend_from_slice(&0u32.to_le_bytes()); // crc
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // extra len
        central.extend_from_slice(&0u16.to_le_bytes()); // comment len
        central.extend_from_slice(&0u16.to_le_bytes()); // disk number
        central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name_bytes);
    }

    let central_offset = jar.len() as u32;
    let central_size = central.len() as u32;
    jar.extend_from_slice(&central);

    jar.extend_from_slice(&0x0605_4B50u32.to_le_bytes());
    jar.extend_from_slice(&0u16.to_le_bytes()); // disk number
    jar.extend_from_slice(&0u16.to_le_bytes()); // central directory disk
    jar.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    jar.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    jar.extend_from_slice(&central_size.to_le_bytes());
    jar.extend_from_slice(&central_offset.to_le_bytes());
    jar.extend_from_slice(&0u16.to_le_bytes()); // comment len

    jar
}

fn app_over(container: ContainerRef) -> Arc<AppClassLoader> {
    let service = ClassLoadingService::new(
        Arc::new(SystemClassLoader::new(Vec::new())),
        Arc::new(DefaultModuleInstaller),
        Arc::new(NoLibraries),
        ApiAccess::new(),
        GlobalConfig::new(),
    );

    service
        .create_top_level_class_loader(
            None,
            GatewayConfiguration::new("inventory"),
            ClassLoaderConfiguration::new(ClassLoaderIdentity::new("inventory", "app"))
                .with_container(container),
        )
        .unwrap()
}

/// A full archive round: manifest, directory markers, classes and resources,
/// all indexed from raw bytes and served through a delegation chain.
#[test]
fn stored_archives_serve_classes() -> Result<()> {
    let widget = class_bytes("widget");
    let jar = build_stored_jar(&[
        (
            "META-INF/MANIFEST.MF",
            b"Manifest-Version: 1.0\nSealed: true\n".as_slice(),
        ),
        ("com/", b"".as_slice()),
        ("com/example/", b"".as_slice()),
        ("com/example/Widget.class", widget.as_slice()),
        ("banner.txt", b"hello".as_slice()),
    ]);

    let container = Arc::new(ArchiveContainer::from_bytes(jar, "memory:/bundle.jar")?);
    assert_eq!(container.len(), 3, "directory markers are not entries");

    let loader = app_over(container);

    let class = loader.load_class("com.example.Widget")?;
    assert_eq!(class.bytes(), class_bytes("widget"));
    assert_eq!(class.defined_by().to_string(), "inventory:app");

    let package = class.package().expect("package record");
    assert!(package.is_sealed());
    assert_eq!(package.seal_base(), Some("memory:/bundle.jar"));

    let banner = loader.resource("banner.txt").expect("resource");
    assert_eq!(banner.data, b"hello");
    assert_eq!(banner.location, "memory:/bundle.jar!/banner.txt");

    assert_eq!(
        class.protection_domain().code_source().location(),
        "memory:/bundle.jar"
    );
    Ok(())
}

/// An archive without a manifest still serves classes, its packages simply
/// carry no attributes.
#[test]
fn manifests_are_optional() -> Result<()> {
    let widget = class_bytes("w");
    let jar = build_stored_jar(&[("com/example/Widget.class", widget.as_slice())]);

    let container = Arc::new(ArchiveContainer::from_bytes(jar, "memory:/bare.jar")?);
    assert!(container.manifest().is_none());

    let loader = app_over(container);
    let class = loader.load_class("com.example.Widget")?;
    assert!(!class.package().expect("package record").is_sealed());
    Ok(())
}

/// Archives whose structure cannot be indexed are rejected at construction,
/// broken class paths must fail loudly instead of serving nothing.
#[test]
fn malformed_archives_are_rejected() {
    assert!(matches!(
        ArchiveContainer::from_bytes(b"not an archive".to_vec(), "memory:/junk.jar").unwrap_err(),
        Error::Malformed { .. }
    ));

    // A truncated archive loses its end record.
    let mut jar = build_stored_jar(&[("a.txt", b"a".as_slice())]);
    jar.truncate(jar.len() - 4);
    assert!(ArchiveContainer::from_bytes(jar, "memory:/cut.jar").is_err());
}

/// Compressed entries are refused, the index only understands stored data.
#[test]
fn compressed_entries_are_refused() {
    let mut jar = build_stored_jar(&[("a.txt", b"a".as_slice())]);

    // Rewrite the method field of the central record to deflate.
    let signature = 0x0201_4B50u32.to_le_bytes();
    let central = jar
        .windows(4)
        .rposition(|window| window == signature)
        .unwrap();
    jar[central + 10] = 8;

    assert!(matches!(
        ArchiveContainer::from_bytes(jar, "memory:/deflate.jar").unwrap_err(),
        Error::Malformed { .. }
    ));
}
