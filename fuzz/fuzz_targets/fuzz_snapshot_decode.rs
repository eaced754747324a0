//! Fuzz target for snapshot file decoding.
//!
//! Tests that `Snapshot::from_bytes` never panics on arbitrary input and that
//! any snapshot it accepts roundtrips through `to_bytes`.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ledger_records_store::Snapshot;

fuzz_target!(|data: &[u8]| {
    if let Ok(snapshot) = Snapshot::from_bytes(data) {
        let bytes = snapshot.to_bytes().expect("accepted snapshot must re-encode");
        let again = Snapshot::from_bytes(&bytes).expect("re-encoded snapshot must decode");
        assert_eq!(snapshot, again, "snapshot roundtrip mismatch");
    }
});
