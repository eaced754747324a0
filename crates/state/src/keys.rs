//! Key layout for records.
//!
//! Every record lives under `{kind}/{id}`, where `kind` is the record type's
//! [`Record::KIND`](ledger_records_types::Record::KIND). Listing one type is a
//! range scan over `[{kind}/, {kind}0)`: `0` is the byte right after `/`, so
//! the range covers exactly the keys with that prefix and nothing of any other
//! kind, even kinds that share a leading substring (`role` and `role_permission`).
//!
//! Key format: {kind}/{id}

/// Separator between kind and id.
pub const KEY_SEPARATOR: char = '/';

/// Decoded record key components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordKey<'a> {
    /// Record type prefix.
    pub kind: &'a str,
    /// Record id within the kind.
    pub id: &'a str,
}

/// Encodes the store key for record `id` of `kind`.
pub fn encode_record_key(kind: &str, id: &str) -> String {
    let mut key = String::with_capacity(kind.len() + 1 + id.len());
    key.push_str(kind);
    key.push(KEY_SEPARATOR);
    key.push_str(id);
    key
}

/// Creates the `[start, end)` scan bounds covering every record of `kind`.
pub fn kind_range(kind: &str) -> (String, String) {
    (format!("{kind}/"), format!("{kind}0"))
}

/// Decodes a store key into its components.
///
/// Returns None if the key has no separator.
pub fn decode_record_key(key: &str) -> Option<RecordKey<'_>> {
    let (kind, id) = key.split_once(KEY_SEPARATOR)?;
    Some(RecordKey { kind, id })
}
