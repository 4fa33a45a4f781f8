#![no_main]

use classgate::container::Manifest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(manifest) = Manifest::parse(data) {
        let _ = manifest.main_attribute("Sealed");
        let _ = manifest.package_attributes("com/example/");
    }
});
