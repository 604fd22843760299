#![no_main]

use libfuzzer_sys::fuzz_target;
use scoop_core::text::{MAX_QUERY_TERMS, build_match_query, index_text};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let _ = index_text(&text);
    if let Some(query) = build_match_query(&text) {
        let terms: Vec<&str> = query.split(" OR ").collect();
        assert!(terms.len() <= MAX_QUERY_TERMS);
        for term in terms {
            assert!(term.len() >= 3 && term.starts_with('"') && term.ends_with('"'));
        }
    }
});
