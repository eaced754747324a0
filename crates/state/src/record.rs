//! Keyed record accessor.
//!
//! Wraps the store's get/put/delete/scan primitives with the existence rules
//! every contract relies on: `create` refuses a present key, `read`, `update`
//! and `delete` refuse an absent one. Listing is scoped to one record kind by
//! its key prefix, so records of other types are never decoded.

use std::marker::PhantomData;

use ledger_records_store::{ScanIter, StateReader, StateWriter};
use ledger_records_types::{
    KeyedRecord, Record, config::ValidationConfig, decode, encode, validation::validate_record_id,
};
use snafu::{ResultExt, ensure};

use crate::{
    error::{
        AlreadyExistsSnafu, DecodeSnafu, EncodeSnafu, InvalidArgumentSnafu, NotFoundSnafu,
        Result, StoreUnavailableSnafu,
    },
    keys::{decode_record_key, encode_record_key, kind_range},
};

/// Record storage operations for one record type.
///
/// Stateless: every operation takes the transaction it runs in, so a sequence
/// of calls within one transaction commits or discards together.
///
/// ```no_run
/// use ledger_records_state::RecordStore;
/// use ledger_records_store::Database;
/// use ledger_records_types::Party;
///
/// let db = Database::open_in_memory()?;
/// let party = Party { name: "Greens".to_string(), vote_count: 0 };
/// db.execute(|txn| RecordStore::<Party>::create(txn, "Greens", &party))?;
///
/// let stored = RecordStore::<Party>::read(&db.read(), "Greens")?;
/// # Ok::<(), ledger_records_state::RecordError>(())
/// ```
pub struct RecordStore<R>(PhantomData<R>);

impl<R: Record> RecordStore<R> {
    /// Checks if a record exists. The payload is not decoded.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn exists<S: StateReader + ?Sized>(state: &S, id: &str) -> Result<bool> {
        state.contains(&encode_record_key(R::KIND, id)).context(StoreUnavailableSnafu)
    }

    /// Creates a record.
    ///
    /// The presence check and the write are a single conditional put.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::AlreadyExists` if a record is stored under `id`.
    /// Returns `RecordError::Encode` if serialization fails.
    /// Returns `RecordError::StoreUnavailable` if the store fails.
    pub fn create<S: StateWriter + ?Sized>(state: &mut S, id: &str, record: &R) -> Result<()> {
        let encoded = encode(record).context(EncodeSnafu { kind: R::KIND, key: id })?;
        let written = state
            .put_if_absent(&encode_record_key(R::KIND, id), encoded)
            .context(StoreUnavailableSnafu)?;
        ensure!(written, AlreadyExistsSnafu { kind: R::KIND, key: id });

        tracing::debug!(kind = R::KIND, key = id, "Created record");
        Ok(())
    }

    /// Returns a record by id.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if no record is stored under `id`.
    /// Returns `RecordError::Decode` if the stored bytes do not decode.
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn read<S: StateReader + ?Sized>(state: &S, id: &str) -> Result<R> {
        let bytes = state
            .get(&encode_record_key(R::KIND, id))
            .context(StoreUnavailableSnafu)?
            .ok_or_else(|| NotFoundSnafu { kind: R::KIND, key: id }.build())?;
        decode(&bytes).context(DecodeSnafu { kind: R::KIND, key: id })
    }

    /// Overwrites an existing record. Last writer wins; there is no version check.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if no record is stored under `id`.
    /// Returns `RecordError::Encode` if serialization fails.
    /// Returns `RecordError::StoreUnavailable` if the store fails.
    pub fn update<S: StateWriter + ?Sized>(state: &mut S, id: &str, record: &R) -> Result<()> {
        let key = encode_record_key(R::KIND, id);
        ensure!(
            state.contains(&key).context(StoreUnavailableSnafu)?,
            NotFoundSnafu { kind: R::KIND, key: id }
        );
        let encoded = encode(record).context(EncodeSnafu { kind: R::KIND, key: id })?;
        state.put(&key, encoded).context(StoreUnavailableSnafu)?;

        tracing::debug!(kind = R::KIND, key = id, "Updated record");
        Ok(())
    }

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if no record is stored under `id`.
    /// Returns `RecordError::StoreUnavailable` if the store fails.
    pub fn delete<S: StateWriter + ?Sized>(state: &mut S, id: &str) -> Result<()> {
        let existed =
            state.delete(&encode_record_key(R::KIND, id)).context(StoreUnavailableSnafu)?;
        ensure!(existed, NotFoundSnafu { kind: R::KIND, key: id });

        tracing::debug!(kind = R::KIND, key = id, "Deleted record");
        Ok(())
    }

    /// Lazily iterates every record of this type in ascending id order.
    ///
    /// Each item is decoded when the iterator reaches it; a decode failure is
    /// yielded as an `Err` item.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the scan cannot start.
    pub fn list_all<S: StateReader + ?Sized>(state: &S) -> Result<RecordIter<'_, R>> {
        let (start, end) = kind_range(R::KIND);
        let inner = state.scan(&start, &end).context(StoreUnavailableSnafu)?;
        Ok(RecordIter { inner, _marker: PhantomData })
    }

    /// Collects every record of this type.
    ///
    /// Fail-fast: the first record that does not decode aborts the listing
    /// and no partial result is returned.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` for the first undecodable record.
    /// Returns `RecordError::StoreUnavailable` if the scan cannot start.
    pub fn collect_all<S: StateReader + ?Sized>(state: &S) -> Result<Vec<KeyedRecord<R>>> {
        Self::list_all(state)?.collect()
    }

    /// Counts the records of this type without decoding them.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the scan cannot start.
    pub fn count<S: StateReader + ?Sized>(state: &S) -> Result<usize> {
        let (start, end) = kind_range(R::KIND);
        Ok(state.scan(&start, &end).context(StoreUnavailableSnafu)?.count())
    }
}

/// Validates a caller-supplied record id before it becomes part of a key.
pub(crate) fn check_record_id(field: &str, id: &str, config: &ValidationConfig) -> Result<()> {
    validate_record_id(field, id, config).context(InvalidArgumentSnafu)
}

/// Lazy iterator over the records of one type, produced by
/// [`RecordStore::list_all`].
pub struct RecordIter<'a, R> {
    inner: ScanIter<'a>,
    _marker: PhantomData<R>,
}

impl<R: Record> Iterator for RecordIter<'_, R> {
    type Item = Result<KeyedRecord<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, bytes) = self.inner.next()?;
        let id = match decode_record_key(&key) {
            Some(decoded) => decoded.id.to_string(),
            None => key.clone(),
        };
        let decoded = decode(&bytes).context(DecodeSnafu { kind: R::KIND, key: &id });
        Some(decoded.map(|record| KeyedRecord { key: id, record }))
    }
}
