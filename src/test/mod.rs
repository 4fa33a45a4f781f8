use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use dashmap::DashMap;

use crate::{
    container::MemoryContainer,
    library::{LibraryActivation, LibraryDefinition, LibraryListener, LibraryProvider, LibraryResolver},
    loader::{
        AppClassLoader, ByteResourceInformation, ClassLoaderConfiguration, ClassLoaderIdentity,
        GeneratorRegistry, LoadedClass, LoaderRef, SystemClassLoader,
    },
    service::GlobalConfig,
    transform::{ClassTransformer, TransformerList},
    Result,
};

// Minimal valid class record: magic, version words, then a recognizable payload.
pub fn class_bytes(payload: &str) -> Vec<u8> {
    let mut bytes = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34];
    bytes.extend_from_slice(payload.as_bytes());
    bytes
}

// The payload of a record built by class_bytes, after any appended transforms.
pub fn class_payload(class: &LoadedClass) -> String {
    String::from_utf8(class.bytes()[8..].to_vec()).unwrap()
}

// Byte resource information backed by a live container, so original_bytes works.
pub fn class_info(class_name: &str, bytes: Vec<u8>, cached: bool) -> ByteResourceInformation {
    let path = format!("{}.class", class_name.replace('.', "/"));
    let container = Arc::new(MemoryContainer::archive("memory:/test.jar"));
    if cached {
        container.add_cached_entry(&path, bytes.clone());
    } else {
        container.add_entry(&path, bytes.clone());
    }
    ByteResourceInformation::new(bytes, path, container, cached)
}

// An application loader with no class path, parented to an empty system loader.
pub fn plain_app_loader(application: &str, qualifier: &str) -> Arc<AppClassLoader> {
    AppClassLoader::new(
        &ClassLoaderConfiguration::new(ClassLoaderIdentity::new(application, qualifier)),
        Arc::new(SystemClassLoader::new(Vec::new())),
        Arc::new(LibraryResolver::new(Arc::new(StaticLibraryProvider::new()))),
        Arc::new(TransformerList::new()),
        Arc::new(GeneratorRegistry::new()),
        Arc::new(GlobalConfig::new()),
    )
}

// Writes a stored-only archive: local records, central directory, end record.
// Names ending in '/' become directory markers.
pub fn build_stored_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
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

// Appends a fixed suffix to every record and counts invocations.
pub struct AppendTransformer {
    suffix: Vec<u8>,
    calls: AtomicUsize,
}

impl AppendTransformer {
    pub fn new(suffix: &[u8]) -> AppendTransformer {
        AppendTransformer {
            suffix: suffix.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassTransformer for AppendTransformer {
    fn transform(
        &self,
        _class_name: &str,
        bytes: &[u8],
        _info: &ByteResourceInformation,
    ) -> Result<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut rewritten = bytes.to_vec();
        rewritten.extend_from_slice(&self.suffix);
        Ok(Some(rewritten))
    }
}

// Declines every record but remembers what it was shown.
pub struct PassiveTransformer {
    calls: AtomicUsize,
    last_seen: Mutex<Vec<u8>>,
}

impl PassiveTransformer {
    pub fn new() -> PassiveTransformer {
        PassiveTransformer {
            calls: AtomicUsize::new(0),
            last_seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Vec<u8> {
        self.last_seen.lock().unwrap().clone()
    }
}

impl ClassTransformer for PassiveTransformer {
    fn transform(
        &self,
        _class_name: &str,
        bytes: &[u8],
        _info: &ByteResourceInformation,
    ) -> Result<Option<Vec<u8>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_seen.lock().unwrap() = bytes.to_vec();
        Ok(None)
    }
}

// Fails every record with a fixed message.
pub struct FailingTransformer {
    message: String,
}

impl FailingTransformer {
    pub fn new(message: &str) -> FailingTransformer {
        FailingTransformer {
            message: message.to_string(),
        }
    }
}

impl ClassTransformer for FailingTransformer {
    fn transform(
        &self,
        _class_name: &str,
        _bytes: &[u8],
        _info: &ByteResourceInformation,
    ) -> Result<Option<Vec<u8>>> {
        Err(crate::Error::Error(self.message.clone()))
    }
}

// A mutable in-memory library provider.
pub struct StaticLibraryProvider {
    definitions: DashMap<String, LibraryDefinition>,
}

impl StaticLibraryProvider {
    pub fn new() -> StaticLibraryProvider {
        StaticLibraryProvider {
            definitions: DashMap::new(),
        }
    }

    pub fn define(&self, name: &str, loader: LoaderRef, activation: LibraryActivation) {
        self.definitions
            .insert(name.to_string(), LibraryDefinition::new(loader, activation));
    }
}

impl LibraryProvider for StaticLibraryProvider {
    fn lookup(&self, name: &str) -> Option<LibraryDefinition> {
        self.definitions.get(name).map(|entry| entry.value().clone())
    }
}

// Records every library notification it receives.
pub struct RecordingListener {
    notifications: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn new() -> RecordingListener {
        RecordingListener {
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn notifications(&self) -> Vec<String> {
        self.notifications.lock().unwrap().clone()
    }
}

impl LibraryListener for RecordingListener {
    fn library_notification(&self, name: &str, _loader: &LoaderRef) {
        self.notifications.lock().unwrap().push(name.to_string());
    }
}
