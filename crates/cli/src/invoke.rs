//! Routes `(contract, operation, string arguments)` to contract functions.
//!
//! Mutating operations run inside one `Database::execute` call, so all of an
//! invocation's writes commit together or not at all. Read-only operations
//! run against a snapshot. Every result is returned as JSON; list operations
//! return `[{"key": .., "record": ..}]`.

use chrono::{NaiveDate, Utc};
use ledger_records_state::{
    EngineError, RbacContract, RealEstateRegistry, RecordError, VoteTally,
};
use ledger_records_store::{Database, StorageBackend};
use ledger_records_types::{ErrorCode, config::ValidationConfig};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::{ResultExt, Snafu, ensure};

/// Contract an invocation is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contract {
    /// Vote tally.
    Vote,
    /// Real-estate registry.
    Registry,
    /// Role-based access control.
    Rbac,
}

impl Contract {
    /// Command-line name of the contract.
    pub fn name(self) -> &'static str {
        match self {
            Contract::Vote => "vote",
            Contract::Registry => "registry",
            Contract::Rbac => "rbac",
        }
    }
}

/// Invocation errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum InvokeError {
    /// The contract has no operation with this name.
    #[snafu(display("Unknown {contract} operation '{operation}'"))]
    UnknownOperation {
        /// Contract name.
        contract: &'static str,
        /// Requested operation.
        operation: String,
    },

    /// Wrong number of arguments.
    #[snafu(display("{operation} expects {expected} argument(s), got {actual}"))]
    Arity {
        /// Operation name.
        operation: String,
        /// Accepted argument count, e.g. `2` or `2-3`.
        expected: String,
        /// Supplied argument count.
        actual: usize,
    },

    /// An argument could not be parsed.
    #[snafu(display("{operation}: invalid {field} '{value}': {reason}"))]
    InvalidArgument {
        /// Operation name.
        operation: String,
        /// Argument name.
        field: &'static str,
        /// Supplied value.
        value: String,
        /// Parse failure.
        reason: String,
    },

    /// A JSON argument could not be decoded.
    #[snafu(display("{operation}: invalid JSON for {field}: {source}"))]
    InvalidJson {
        /// Operation name.
        operation: String,
        /// Argument name.
        field: &'static str,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// The contract operation failed.
    #[snafu(display("{operation} failed: {source}"))]
    Record {
        /// Operation name.
        operation: String,
        /// Contract error.
        source: RecordError,
    },

    /// The store could not be opened.
    #[snafu(display("{source}"))]
    Storage {
        /// Engine error.
        source: EngineError,
    },

    /// The result could not be rendered as JSON.
    #[snafu(display("Failed to render result of {operation}: {source}"))]
    Output {
        /// Operation name.
        operation: String,
        /// Encoder error.
        source: serde_json::Error,
    },
}

impl InvokeError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            InvokeError::UnknownOperation { .. }
            | InvokeError::Arity { .. }
            | InvokeError::InvalidArgument { .. }
            | InvokeError::InvalidJson { .. } => ErrorCode::AppInvalidArgument,
            InvokeError::Record { source, .. } => source.code(),
            InvokeError::Storage { source: EngineError::Open { source, .. } } => {
                if source.is_corruption() {
                    ErrorCode::StorageCorruption
                } else {
                    ErrorCode::StorageUnavailable
                }
            },
            InvokeError::Output { .. } => ErrorCode::AppSerialization,
        }
    }

    /// JSON error report: `{"code", "kind", "message"}`.
    pub fn to_json(&self) -> Value {
        let code = self.code();
        serde_json::json!({
            "code": code.as_u16(),
            "kind": code.name(),
            "message": self.to_string(),
        })
    }
}

type Result<T, E = InvokeError> = std::result::Result<T, E>;

/// Positional arguments of one operation.
struct Args<'a> {
    operation: &'a str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    fn exactly<const N: usize>(&self) -> Result<[&'a str; N]> {
        ensure!(
            self.values.len() == N,
            AritySnafu {
                operation: self.operation,
                expected: N.to_string(),
                actual: self.values.len(),
            }
        );
        let values = self.values;
        Ok(std::array::from_fn(|i| values[i].as_str()))
    }

    fn none(&self) -> Result<()> {
        self.exactly::<0>().map(|_| ())
    }

    fn one(&self) -> Result<&'a str> {
        let [value] = self.exactly::<1>()?;
        Ok(value)
    }

    fn parse_u64(&self, field: &'static str, value: &str) -> Result<u64> {
        value.parse().map_err(|e: std::num::ParseIntError| {
            InvalidArgumentSnafu {
                operation: self.operation,
                field,
                value,
                reason: e.to_string(),
            }
            .build()
        })
    }

    fn parse_bool(&self, field: &'static str, value: &str) -> Result<bool> {
        value.parse().map_err(|e: std::str::ParseBoolError| {
            InvalidArgumentSnafu {
                operation: self.operation,
                field,
                value,
                reason: e.to_string(),
            }
            .build()
        })
    }

    fn parse_date(&self, field: &'static str, value: &str) -> Result<Option<NaiveDate>> {
        if value.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map(Some).map_err(|e| {
            InvalidArgumentSnafu {
                operation: self.operation,
                field,
                value,
                reason: e.to_string(),
            }
            .build()
        })
    }

    fn parse_json<T: DeserializeOwned>(&self, field: &'static str, value: &str) -> Result<T> {
        serde_json::from_str(value).context(InvalidJsonSnafu { operation: self.operation, field })
    }
}

/// Dispatches invocations to the three contracts.
#[derive(Debug, Clone, Default)]
pub struct Invoker {
    tally: VoteTally,
    registry: RealEstateRegistry,
    rbac: RbacContract,
}

impl Invoker {
    /// Creates an invoker whose contracts apply the given input limits.
    pub fn new(validation: ValidationConfig) -> Self {
        Self {
            tally: VoteTally::new(validation.clone()),
            registry: RealEstateRegistry::new(validation.clone()),
            rbac: RbacContract::new(validation),
        }
    }

    /// Runs one operation and returns its JSON result.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::UnknownOperation`] or [`InvokeError::Arity`]
    /// for malformed invocations and [`InvokeError::Record`] if the contract
    /// rejects the operation. A failed invocation leaves the store unchanged.
    pub fn invoke<B: StorageBackend>(
        &self,
        db: &Database<B>,
        contract: Contract,
        operation: &str,
        args: &[String],
    ) -> Result<Value> {
        let args = Args { operation, values: args };
        tracing::debug!(contract = contract.name(), operation, args = args.values.len(), "Invoke");
        match contract {
            Contract::Vote => self.invoke_vote(db, &args),
            Contract::Registry => self.invoke_registry(db, &args),
            Contract::Rbac => self.invoke_rbac(db, &args),
        }
    }

    fn invoke_vote<B: StorageBackend>(&self, db: &Database<B>, args: &Args<'_>) -> Result<Value> {
        let op = args.operation;
        let tally = &self.tally;
        match op {
            "initLedger" => {
                args.none()?;
                write(db, op, |txn| tally.init_ledger(txn))
            },
            "createParty" => {
                let name = args.one()?;
                write(db, op, |txn| tally.create_party(txn, name))
            },
            "readParty" => {
                let name = args.one()?;
                read(db, op, |snap| tally.read_party(snap, name))
            },
            "updateParty" => {
                let [name, votes] = args.exactly()?;
                let votes = args.parse_u64("voteCount", votes)?;
                write(db, op, |txn| tally.update_party(txn, name, votes))
            },
            "deleteParty" => {
                let name = args.one()?;
                write(db, op, |txn| tally.delete_party(txn, name))
            },
            "partyExists" => {
                let name = args.one()?;
                read(db, op, |snap| tally.party_exists(snap, name))
            },
            "castVote" => {
                let name = args.one()?;
                write(db, op, |txn| tally.cast_vote(txn, name))
            },
            "getAllParties" => {
                args.none()?;
                read(db, op, |snap| tally.get_all_parties(snap))
            },
            _ => UnknownOperationSnafu { contract: Contract::Vote.name(), operation: op }.fail(),
        }
    }

    fn invoke_registry<B: StorageBackend>(
        &self,
        db: &Database<B>,
        args: &Args<'_>,
    ) -> Result<Value> {
        let op = args.operation;
        let registry = &self.registry;
        match op {
            "initLedger" => {
                args.none()?;
                write(db, op, |txn| registry.init_ledger(txn))
            },
            "createRealEstate" => {
                let [id, location, rooms, baths, price, living_space] = args.exactly()?;
                write(db, op, |txn| {
                    registry.create_real_estate(
                        txn,
                        id,
                        location,
                        rooms,
                        baths,
                        price,
                        living_space,
                    )
                })
            },
            "readRealEstate" => {
                let id = args.one()?;
                read(db, op, |snap| registry.read_real_estate(snap, id))
            },
            "updateRealEstate" => {
                let [id, json] = args.exactly()?;
                let record = args.parse_json("record", json)?;
                write(db, op, |txn| {
                    registry.update_real_estate(txn, id, &record)?;
                    Ok(record)
                })
            },
            "realEstateExists" => {
                let id = args.one()?;
                read(db, op, |snap| registry.real_estate_exists(snap, id))
            },
            "changeOwner" => {
                let [id, owner] = args.exactly()?;
                write(db, op, |txn| registry.change_owner(txn, id, owner))
            },
            "changePrice" => {
                let [id, price] = args.exactly()?;
                write(db, op, |txn| registry.change_price(txn, id, price))
            },
            "queryAll" => {
                args.none()?;
                read(db, op, |snap| registry.query_all(snap))
            },
            _ => {
                UnknownOperationSnafu { contract: Contract::Registry.name(), operation: op }.fail()
            },
        }
    }

    fn invoke_rbac<B: StorageBackend>(&self, db: &Database<B>, args: &Args<'_>) -> Result<Value> {
        let op = args.operation;
        let rbac = &self.rbac;
        match op {
            // Projects
            "createProject" => {
                let (name, creator_id, due_date) = match args.values.len() {
                    2 => {
                        let [name, creator_id] = args.exactly()?;
                        (name, creator_id, None)
                    },
                    3 => {
                        let [name, creator_id, due_date] = args.exactly()?;
                        (name, creator_id, args.parse_date("dueDate", due_date)?)
                    },
                    actual => {
                        return AritySnafu { operation: op, expected: "2-3", actual }.fail();
                    },
                };
                let now = Utc::now();
                write(db, op, |txn| rbac.create_project(txn, name, creator_id, due_date, now))
            },
            "readProject" => {
                let name = args.one()?;
                read(db, op, |snap| rbac.read_project(snap, name))
            },
            "updateProject" => {
                let [name, json] = args.exactly()?;
                let project = args.parse_json("project", json)?;
                write(db, op, |txn| {
                    rbac.update_project(txn, name, &project)?;
                    Ok(project)
                })
            },
            "projectExists" => {
                let name = args.one()?;
                read(db, op, |snap| rbac.project_exists(snap, name))
            },
            "getAllProjects" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_projects(snap))
            },
            "changeProjectActiveStatus" => {
                let [name, active] = args.exactly()?;
                let active = args.parse_bool("active", active)?;
                write(db, op, |txn| rbac.change_project_active_status(txn, name, active))
            },

            // Roles
            "createRole" => {
                let name = args.one()?;
                write(db, op, |txn| rbac.create_role(txn, name))
            },
            "readRole" => {
                let name = args.one()?;
                read(db, op, |snap| rbac.read_role(snap, name))
            },
            "updateRole" => {
                let [name, json] = args.exactly()?;
                let role = args.parse_json("role", json)?;
                write(db, op, |txn| {
                    rbac.update_role(txn, name, &role)?;
                    Ok(role)
                })
            },
            "roleExists" => {
                let name = args.one()?;
                read(db, op, |snap| rbac.role_exists(snap, name))
            },
            "getAllRoles" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_roles(snap))
            },

            // Permissions
            "createPermission" => {
                let name = args.one()?;
                write(db, op, |txn| rbac.create_permission(txn, name))
            },
            "readPermission" => {
                let name = args.one()?;
                read(db, op, |snap| rbac.read_permission(snap, name))
            },
            "updatePermission" => {
                let [name, json] = args.exactly()?;
                let permission = args.parse_json("permission", json)?;
                write(db, op, |txn| {
                    rbac.update_permission(txn, name, &permission)?;
                    Ok(permission)
                })
            },
            "permissionExists" => {
                let name = args.one()?;
                read(db, op, |snap| rbac.permission_exists(snap, name))
            },
            "getAllPermissions" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_permissions(snap))
            },

            // Grants
            "assignPermissions" => {
                let [role_name, json] = args.exactly()?;
                let permissions = args.parse_json("permissions", json)?;
                write(db, op, |txn| rbac.assign_permissions(txn, role_name, permissions))
            },
            "readRolePermission" => {
                let id = args.one()?;
                read(db, op, |snap| rbac.read_role_permission(snap, id))
            },
            "rolePermissionExists" => {
                let id = args.one()?;
                read(db, op, |snap| rbac.role_permission_exists(snap, id))
            },
            "getAllRolePermissions" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_role_permissions(snap))
            },

            // Users
            "createUser" => {
                let [uid, user_type, pub_key] = args.exactly()?;
                write(db, op, |txn| rbac.create_user(txn, uid, user_type, pub_key))
            },
            "readUser" => {
                let uid = args.one()?;
                read(db, op, |snap| rbac.read_user(snap, uid))
            },
            "userExists" => {
                let uid = args.one()?;
                read(db, op, |snap| rbac.user_exists(snap, uid))
            },
            "getAllUsers" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_users(snap))
            },
            "changeUserActiveStatus" => {
                let [uid, active] = args.exactly()?;
                let active = args.parse_bool("active", active)?;
                write(db, op, |txn| rbac.change_user_active_status(txn, uid, active))
            },

            // Assignments
            "assignRole" => {
                let [project, user_id, role_name] = args.exactly()?;
                write(db, op, |txn| rbac.assign_role(txn, project, user_id, role_name))
            },
            "readUserRole" => {
                let id = args.one()?;
                read(db, op, |snap| rbac.read_user_role(snap, id))
            },
            "userRoleExists" => {
                let id = args.one()?;
                read(db, op, |snap| rbac.user_role_exists(snap, id))
            },
            "getAllUserRoles" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_user_roles(snap))
            },

            // Tasks
            "createTask" => {
                let (project, creator_id, assignee_id, responsible_id, due_date) =
                    match args.values.len() {
                        4 => {
                            let [project, creator_id, assignee_id, responsible_id] =
                                args.exactly()?;
                            (project, creator_id, assignee_id, responsible_id, None)
                        },
                        5 => {
                            let [project, creator_id, assignee_id, responsible_id, due_date] =
                                args.exactly()?;
                            let due_date = args.parse_date("dueDate", due_date)?;
                            (project, creator_id, assignee_id, responsible_id, due_date)
                        },
                        actual => {
                            return AritySnafu { operation: op, expected: "4-5", actual }.fail();
                        },
                    };
                let now = Utc::now();
                write(db, op, |txn| {
                    rbac.create_task(
                        txn,
                        project,
                        creator_id,
                        assignee_id,
                        responsible_id,
                        due_date,
                        now,
                    )
                })
            },
            "readTask" => {
                let id = args.one()?;
                read(db, op, |snap| rbac.read_task(snap, id))
            },
            "taskExists" => {
                let id = args.one()?;
                read(db, op, |snap| rbac.task_exists(snap, id))
            },
            "getAllTasks" => {
                args.none()?;
                read(db, op, |snap| rbac.get_all_tasks(snap))
            },
            "completeTask" => {
                let id = args.one()?;
                let now = Utc::now();
                write(db, op, |txn| rbac.complete_task(txn, id, now))
            },
            "changeTaskActiveStatus" => {
                let [id, active] = args.exactly()?;
                let active = args.parse_bool("active", active)?;
                write(db, op, |txn| rbac.change_task_active_status(txn, id, active))
            },
            _ => UnknownOperationSnafu { contract: Contract::Rbac.name(), operation: op }.fail(),
        }
    }
}

/// Runs a mutating operation in one transaction and renders its result.
fn write<B, T, F>(db: &Database<B>, operation: &str, f: F) -> Result<Value>
where
    B: StorageBackend,
    T: Serialize,
    F: FnOnce(&mut ledger_records_store::WriteTransaction<'_, B>) -> Result<T, RecordError>,
{
    let result = db.execute(f).context(RecordSnafu { operation })?;
    render(operation, &result)
}

/// Runs a read-only operation against the committed snapshot.
fn read<B, T, F>(db: &Database<B>, operation: &str, f: F) -> Result<Value>
where
    B: StorageBackend,
    T: Serialize,
    F: FnOnce(&ledger_records_store::ReadTransaction) -> Result<T, RecordError>,
{
    let snapshot = db.read();
    let result = f(&snapshot).context(RecordSnafu { operation })?;
    render(operation, &result)
}

fn render<T: Serialize>(operation: &str, result: &T) -> Result<Value> {
    serde_json::to_value(result).context(OutputSnafu { operation })
}
