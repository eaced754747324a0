//! Real-estate registry contract.
//!
//! One [`RealEstate`] record per listing. Listings created through the
//! contract are owned by [`AGENCY_OWNER`] until transferred with
//! [`RealEstateRegistry::change_owner`].

use ledger_records_store::{StateReader, StateWriter};
use ledger_records_types::{KeyedRecord, RealEstate, config::ValidationConfig};

use crate::{
    error::Result,
    record::{RecordStore, check_record_id},
};

type Listings = RecordStore<RealEstate>;

/// Owner of every newly created listing.
pub const AGENCY_OWNER: &str = "Agency";

/// Listings seeded by [`RealEstateRegistry::init_ledger`] as
/// `(location, rooms, baths, price, living_space)`, stored as `RE0`..`RE8`.
const SEED_LISTINGS: [(&str, &str, &str, &str, &str); 9] = [
    ("Istanbul", "5", "2", "$140,000", "120m2"),
    ("Izmir", "3", "1", "$75,000", "90m2"),
    ("Ankara", "4", "2", "$135,000", "140m2"),
    ("Istanbul", "1", "1", "$300,000", "40m2"),
    ("Bursa", "5", "2", "$100,000", "200m2"),
    ("Istanbul", "2", "1", "$55,000", "80m2"),
    ("Ankara", "3", "1", "$90,000", "120m2"),
    ("Istanbul", "7", "3", "$1,135,500", "370m2"),
    ("Izmir", "2", "1", "$55,000", "80m2"),
];

/// Real-estate registry operations.
#[derive(Debug, Clone, Default)]
pub struct RealEstateRegistry {
    validation: ValidationConfig,
}

impl RealEstateRegistry {
    /// Creates the contract with the given input limits.
    pub fn new(validation: ValidationConfig) -> Self {
        Self { validation }
    }

    /// Seeds the nine fixed listings under `RE0`..`RE8`.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::AlreadyExists` if any seed id is already stored.
    pub fn init_ledger<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
    ) -> Result<Vec<KeyedRecord<RealEstate>>> {
        let mut seeded = Vec::with_capacity(SEED_LISTINGS.len());
        for (index, (location, rooms, baths, price, living_space)) in
            SEED_LISTINGS.into_iter().enumerate()
        {
            let key = format!("RE{index}");
            let record = listing(location, rooms, baths, price, living_space, AGENCY_OWNER);
            Listings::create(state, &key, &record)?;
            seeded.push(KeyedRecord { key, record });
        }
        tracing::info!(listings = seeded.len(), "Seeded real-estate registry");
        Ok(seeded)
    }

    /// Creates a listing owned by [`AGENCY_OWNER`].
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` for a malformed id and
    /// `RecordError::AlreadyExists` if the id is taken.
    #[allow(clippy::too_many_arguments)]
    pub fn create_real_estate<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        id: &str,
        location: &str,
        rooms: &str,
        baths: &str,
        price: &str,
        living_space: &str,
    ) -> Result<RealEstate> {
        check_record_id("id", id, &self.validation)?;
        let record = listing(location, rooms, baths, price, living_space, AGENCY_OWNER);
        Listings::create(state, id, &record)?;
        Ok(record)
    }

    /// Returns a listing.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the listing does not exist.
    pub fn read_real_estate<S: StateReader + ?Sized>(
        &self,
        state: &S,
        id: &str,
    ) -> Result<RealEstate> {
        Listings::read(state, id)
    }

    /// Replaces a listing.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the listing does not exist.
    pub fn update_real_estate<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        id: &str,
        record: &RealEstate,
    ) -> Result<()> {
        Listings::update(state, id, record)
    }

    /// Checks if a listing exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn real_estate_exists<S: StateReader + ?Sized>(&self, state: &S, id: &str) -> Result<bool> {
        Listings::exists(state, id)
    }

    /// Transfers a listing to a new owner.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the listing does not exist.
    pub fn change_owner<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        id: &str,
        owner: &str,
    ) -> Result<RealEstate> {
        let mut record = Listings::read(state, id)?;
        owner.clone_into(&mut record.owner);
        Listings::update(state, id, &record)?;

        tracing::debug!(listing = id, owner, "Changed owner");
        Ok(record)
    }

    /// Changes a listing's asking price.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the listing does not exist.
    pub fn change_price<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        id: &str,
        price: &str,
    ) -> Result<RealEstate> {
        let mut record = Listings::read(state, id)?;
        price.clone_into(&mut record.price);
        Listings::update(state, id, &record)?;
        Ok(record)
    }

    /// Lists every listing with its id, in id order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored listing does not decode.
    pub fn query_all<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<RealEstate>>> {
        Listings::collect_all(state)
    }
}

fn listing(
    location: &str,
    rooms: &str,
    baths: &str,
    price: &str,
    living_space: &str,
    owner: &str,
) -> RealEstate {
    RealEstate {
        location: location.to_string(),
        rooms: rooms.to_string(),
        baths: baths.to_string(),
        price: price.to_string(),
        living_space: living_space.to_string(),
        owner: owner.to_string(),
    }
}
