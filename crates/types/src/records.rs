//! Record type definitions.
//!
//! Every record persisted by a contract implements [`Record`], which binds the
//! type to the key prefix it lives under. Giving each type its own prefix is
//! what lets a "list all" scan stay within one type even though every record
//! shares a single flat namespace.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// A typed entity stored under one key.
pub trait Record: Serialize + DeserializeOwned {
    /// Key prefix for this record type.
    ///
    /// Must be unique across record types and must not contain `/`.
    const KIND: &'static str;
}

/// A record paired with the id it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedRecord<R> {
    /// Record id (the key without its type prefix).
    pub key: String,
    /// Decoded record.
    pub record: R,
}

// ============================================================================
// Vote tally
// ============================================================================

/// A party collecting votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party name, also the record id.
    pub name: String,
    /// Number of votes cast for the party.
    pub vote_count: u64,
}

impl Record for Party {
    const KIND: &'static str = "party";
}

// ============================================================================
// Real-estate registry
// ============================================================================

/// A real-estate listing. All fields are opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealEstate {
    /// City or address of the property.
    pub location: String,
    /// Number of rooms, as written by the listing agent.
    pub rooms: String,
    /// Number of bathrooms.
    pub baths: String,
    /// Asking price, including its currency (e.g. `"$45,000"`).
    pub price: String,
    /// Living space, including its unit (e.g. `"150m2"`).
    pub living_space: String,
    /// Current owner.
    pub owner: String,
}

impl Record for RealEstate {
    const KIND: &'static str = "real_estate";
}

// ============================================================================
// RBAC
// ============================================================================

/// A project. Creating one also creates its `<name>_user` and `<name>_PM` roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Generated identifier, independent of the record key.
    pub id: String,
    /// Project name, also the record id.
    pub name: String,
    /// Identifier of the user who created the project. Not checked against users.
    pub creator_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Whether the project is active.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Record for Project {
    const KIND: &'static str = "project";
}

/// A named role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Generated identifier, independent of the record key.
    pub id: String,
    /// Role name, also the record id.
    pub name: String,
}

impl Record for Role {
    const KIND: &'static str = "role";
}

/// A named permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Generated identifier. Empty for permissions supplied inline to a grant.
    #[serde(default)]
    pub id: String,
    /// Permission name, also the record id when stored on its own.
    pub name: String,
}

impl Record for Permission {
    const KIND: &'static str = "permission";
}

/// A grant of permissions to a role.
///
/// The permissions are copied by value at grant time. Later edits to a stored
/// [`Permission`] do not change existing grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Generated identifier, also the record id.
    pub id: String,
    /// `id` field of the granted role.
    pub role_id: String,
    /// Snapshot of the granted permissions, in the order given.
    pub permissions: Vec<Permission>,
}

impl Record for RolePermission {
    const KIND: &'static str = "role_permission";
}

/// A user known to the RBAC contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier, also the record id.
    pub uid: String,
    /// Whether the user is active.
    pub active: bool,
    /// Free-form user classification.
    pub user_type: String,
    /// Public key of the user, opaque to the contract.
    pub pub_key: String,
}

impl Record for User {
    const KIND: &'static str = "user";
}

/// Assignment of a role to a user within a project.
///
/// Like [`RolePermission`], the role is embedded as a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    /// Generated identifier, also the record id.
    pub id: String,
    /// Name of the project the assignment applies to.
    pub project_id: String,
    /// Assigned user.
    pub user_id: String,
    /// Snapshot of the assigned role.
    pub role: Role,
}

impl Record for UserRole {
    const KIND: &'static str = "user_role";
}

/// A unit of work inside a project.
///
/// User references are recorded as given, like [`UserRole::user_id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Generated identifier, also the record id.
    pub id: String,
    /// Name of the project the task belongs to.
    pub project_id: String,
    /// User who created the task.
    pub creator_id: String,
    /// User the task is assigned to.
    pub assignee_id: String,
    /// User accountable for the task's outcome.
    pub responsible_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Set once the task is completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Whether the task is active. Completing a task deactivates it.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Record for Task {
    const KIND: &'static str = "task";
}

fn default_active() -> bool {
    true
}
