//! Fuzz target for the record codec.
//!
//! Tests that `decode` never panics on arbitrary bytes for any record type,
//! and that successfully decoded records re-encode to bytes that decode to
//! the same record.

#![no_main]

use libfuzzer_sys::fuzz_target;

use ledger_records_types::{
    Party, Permission, Project, RealEstate, Role, RolePermission, Task, User, UserRole, decode,
    encode,
};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let selector = data[0] % 9;
    let payload = &data[1..];

    match selector {
        0 => roundtrip::<Party>(payload),
        1 => roundtrip::<RealEstate>(payload),
        2 => roundtrip::<Project>(payload),
        3 => roundtrip::<Role>(payload),
        4 => roundtrip::<Permission>(payload),
        5 => roundtrip::<RolePermission>(payload),
        6 => roundtrip::<User>(payload),
        7 => roundtrip::<UserRole>(payload),
        _ => roundtrip::<Task>(payload),
    }
});

fn roundtrip<R>(data: &[u8])
where
    R: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    if let Ok(record) = decode::<R>(data) {
        let encoded = encode(&record).expect("decoded record must re-encode");
        let again = decode::<R>(&encoded).expect("re-encoded record must decode");
        assert_eq!(record, again, "record roundtrip mismatch");
    }
}
