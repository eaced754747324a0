//! Vote tally contract.
//!
//! One [`Party`] record per party, keyed by party name, holding a vote
//! counter. Casting a vote is a read-increment-write of one record inside the
//! caller's transaction; the store's single-writer lock serializes concurrent
//! votes for the same party.

use ledger_records_store::{StateReader, StateWriter};
use ledger_records_types::{KeyedRecord, Party, config::ValidationConfig};
use snafu::OptionExt;

use crate::{
    error::{Result, VoteOverflowSnafu},
    record::{RecordStore, check_record_id},
};

type Parties = RecordStore<Party>;

/// Parties seeded by [`VoteTally::init_ledger`].
pub const SEED_PARTIES: [&str; 2] = ["Republicans", "Democrats"];

/// Vote tally operations.
#[derive(Debug, Clone, Default)]
pub struct VoteTally {
    validation: ValidationConfig,
}

impl VoteTally {
    /// Creates the contract with the given input limits.
    pub fn new(validation: ValidationConfig) -> Self {
        Self { validation }
    }

    /// Seeds the ledger with [`SEED_PARTIES`], each with zero votes.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::AlreadyExists` if any seed party is already
    /// stored; the caller's transaction should then be discarded.
    pub fn init_ledger<S: StateWriter + ?Sized>(&self, state: &mut S) -> Result<Vec<Party>> {
        let mut seeded = Vec::with_capacity(SEED_PARTIES.len());
        for name in SEED_PARTIES {
            let party = Party { name: name.to_string(), vote_count: 0 };
            Parties::create(state, name, &party)?;
            seeded.push(party);
        }
        tracing::info!(parties = seeded.len(), "Seeded vote tally");
        Ok(seeded)
    }

    /// Creates a party with zero votes.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` for a malformed name and
    /// `RecordError::AlreadyExists` if the party exists.
    pub fn create_party<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
    ) -> Result<Party> {
        check_record_id("name", name, &self.validation)?;
        let party = Party { name: name.to_string(), vote_count: 0 };
        Parties::create(state, name, &party)?;
        Ok(party)
    }

    /// Returns a party.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the party does not exist.
    pub fn read_party<S: StateReader + ?Sized>(&self, state: &S, name: &str) -> Result<Party> {
        Parties::read(state, name)
    }

    /// Replaces a party's vote count.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the party does not exist.
    pub fn update_party<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        vote_count: u64,
    ) -> Result<Party> {
        let party = Party { name: name.to_string(), vote_count };
        Parties::update(state, name, &party)?;
        Ok(party)
    }

    /// Deletes a party.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the party does not exist.
    pub fn delete_party<S: StateWriter + ?Sized>(&self, state: &mut S, name: &str) -> Result<()> {
        Parties::delete(state, name)
    }

    /// Checks if a party exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn party_exists<S: StateReader + ?Sized>(&self, state: &S, name: &str) -> Result<bool> {
        Parties::exists(state, name)
    }

    /// Adds exactly one vote to a party and returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the party does not exist and
    /// `RecordError::VoteOverflow` if its counter is already at `u64::MAX`.
    pub fn cast_vote<S: StateWriter + ?Sized>(&self, state: &mut S, name: &str) -> Result<Party> {
        let mut party = Parties::read(state, name)?;
        party.vote_count = party.vote_count.checked_add(1).context(VoteOverflowSnafu { name })?;
        Parties::update(state, name, &party)?;

        tracing::debug!(party = name, votes = party.vote_count, "Cast vote");
        Ok(party)
    }

    /// Lists every party in name order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored party does not decode.
    pub fn get_all_parties<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<Party>>> {
        Parties::collect_all(state)
    }
}
