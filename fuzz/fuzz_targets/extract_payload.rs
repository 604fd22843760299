#![no_main]

use libfuzzer_sys::fuzz_target;
use scoop_novelty::payload::extract_json_object;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(object) = extract_json_object(text) {
            // Whatever was extracted must be a standalone JSON object.
            let encoded = serde_json::Value::Object(object).to_string();
            assert!(encoded.starts_with('{'));
        }
    }
});
