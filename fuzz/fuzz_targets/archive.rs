#![no_main]

use classgate::container::{ArchiveContainer, ContentContainer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(container) = ArchiveContainer::from_bytes(data.to_vec(), "fuzz:/input.jar") {
        for name in container.entry_names() {
            let _ = container.entry(&name);
        }
    }
});
