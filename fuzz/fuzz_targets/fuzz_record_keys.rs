//! Fuzz target for record key layout.
//!
//! Tests that `decode_record_key` never panics on arbitrary strings, that
//! encoded keys decode back to their parts, and that every encoded key falls
//! inside its kind's scan range and outside every other kind's.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ledger_records_state::{decode_record_key, encode_record_key, kind_range};

const KINDS: [&str; 8] =
    ["party", "real_estate", "project", "role", "permission", "role_permission", "user", "user_role"];

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary input must never panic
    let _ = decode_record_key(text);

    if text.contains('/') {
        return;
    }

    for kind in KINDS {
        let key = encode_record_key(kind, text);
        let decoded = decode_record_key(&key).expect("encoded key must decode");
        assert_eq!(decoded.kind, kind);
        assert_eq!(decoded.id, text);

        for other in KINDS {
            let (start, end) = kind_range(other);
            let inside = key >= start && key < end;
            assert_eq!(inside, other == kind, "key {key:?} vs range of {other}");
        }
    }
});
