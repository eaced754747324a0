//! Proptest strategies for ledger-records record types.
//!
//! Reusable generators for property-based testing across crates. Strategies
//! produce well-formed records while exploring edge cases through random
//! variation.
//!
//! # Usage
//!
//! ```no_run
//! use ledger_records_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(party in strategies::arb_party()) {
//!         // test invariant with a randomly generated party
//!     }
//! }
//! ```

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ledger_records_types::{
    Party, Permission, Project, RealEstate, Role, RolePermission, Task, User, UserRole,
};
use proptest::prelude::*;

/// Generates a record id accepted by the default validation rules.
///
/// Mixes ASCII, spaces, underscores and a few non-ASCII letters; never
/// contains `/` or control characters.
pub fn arb_record_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ çğıöşüÇĞİÖŞÜ.-]{1,32}"
}

/// Generates a decimal snowflake-style id.
pub fn arb_generated_id() -> impl Strategy<Value = String> {
    any::<u64>().prop_map(|id| id.to_string())
}

/// Generates free-form text of 0-48 characters, including quotes and escapes
/// that stress the JSON encoding.
pub fn arb_text() -> impl Strategy<Value = String> {
    "[ -~çğüö\"\\\\]{0,48}"
}

/// Generates a UTC timestamp with second precision between 2020 and 2040.
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_577_836_800i64..2_208_988_800i64)
        .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
}

/// Generates an optional calendar date between 2020 and 2040.
pub fn arb_due_date() -> impl Strategy<Value = Option<NaiveDate>> {
    proptest::option::of(
        (2020i32..2040, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()),
    )
}

/// Generates an arbitrary [`Party`].
pub fn arb_party() -> impl Strategy<Value = Party> {
    (arb_record_id(), any::<u64>()).prop_map(|(name, vote_count)| Party { name, vote_count })
}

/// Generates an arbitrary [`RealEstate`] listing.
pub fn arb_real_estate() -> impl Strategy<Value = RealEstate> {
    (arb_text(), "[0-9]{1,2}", "[0-9]", "\\$[0-9]{1,3}(,[0-9]{3}){0,2}", "[0-9]{2,3}m2", arb_text())
        .prop_map(|(location, rooms, baths, price, living_space, owner)| RealEstate {
            location,
            rooms,
            baths,
            price,
            living_space,
            owner,
        })
}

/// Generates an arbitrary [`Project`].
pub fn arb_project() -> impl Strategy<Value = Project> {
    (
        arb_generated_id(),
        arb_record_id(),
        arb_record_id(),
        arb_timestamp(),
        arb_due_date(),
        any::<bool>(),
    )
        .prop_map(|(id, name, creator_id, created_at, due_date, active)| Project {
            id,
            name,
            creator_id,
            created_at,
            due_date,
            active,
        })
}

/// Generates an arbitrary [`Role`].
pub fn arb_role() -> impl Strategy<Value = Role> {
    (arb_generated_id(), arb_record_id()).prop_map(|(id, name)| Role { id, name })
}

/// Generates an arbitrary [`Permission`]. The id is empty about a quarter of
/// the time, as for permissions supplied inline to a grant.
pub fn arb_permission() -> impl Strategy<Value = Permission> {
    (prop_oneof![1 => Just(String::new()), 3 => arb_generated_id()], arb_record_id())
        .prop_map(|(id, name)| Permission { id, name })
}

/// Generates a [`RolePermission`] grant with 0-7 permissions.
pub fn arb_role_permission() -> impl Strategy<Value = RolePermission> {
    (arb_generated_id(), arb_generated_id(), proptest::collection::vec(arb_permission(), 0..8))
        .prop_map(|(id, role_id, permissions)| RolePermission { id, role_id, permissions })
}

/// Generates an arbitrary [`User`].
pub fn arb_user() -> impl Strategy<Value = User> {
    (arb_record_id(), any::<bool>(), arb_text(), "[0-9a-f]{0,64}").prop_map(
        |(uid, active, user_type, pub_key)| User { uid, active, user_type, pub_key },
    )
}

/// Generates an arbitrary [`UserRole`] assignment.
pub fn arb_user_role() -> impl Strategy<Value = UserRole> {
    (arb_generated_id(), arb_record_id(), arb_record_id(), arb_role()).prop_map(
        |(id, project_id, user_id, role)| UserRole { id, project_id, user_id, role },
    )
}

/// Generates an arbitrary [`Task`]. Completed tasks are always inactive.
pub fn arb_task() -> impl Strategy<Value = Task> {
    let people = (arb_record_id(), arb_record_id(), arb_record_id());
    let dates = (arb_timestamp(), arb_due_date(), proptest::option::of(arb_timestamp()));
    (arb_generated_id(), arb_record_id(), people, dates, any::<bool>()).prop_map(
        |(id, project_id, (creator_id, assignee_id, responsible_id), dates, active)| {
            let (created_at, due_date, completed_at) = dates;
            Task {
                id,
                project_id,
                creator_id,
                assignee_id,
                responsible_id,
                created_at,
                due_date,
                active: active && completed_at.is_none(),
                completed_at,
            }
        },
    )
}

/// Generates a sequence of 1-`max_len` distinct record ids.
pub fn arb_distinct_ids(max_len: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set(arb_record_id(), 1..=max_len.max(1))
        .prop_map(|ids| ids.into_iter().collect())
}
