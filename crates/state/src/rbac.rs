//! Role-based access control contract.
//!
//! Projects, roles, permissions and users are stored under their names.
//! Grants ([`RolePermission`]) and assignments ([`UserRole`]) are stored under
//! generated ids and embed copies of the role or permissions they refer to, so
//! editing a role or permission later does not rewrite existing grants.
//! Tasks are also stored under generated ids and name their project.
//!
//! Nothing here enforces access decisions; the contract only records the model.
//!
//! Creating a project writes three records: the project and its `<name>_user`
//! and `<name>_PM` roles. The operation returns an error if any of them
//! already exists, and the caller discards the transaction, so a failed
//! creation leaves no partial project behind.

use chrono::{DateTime, NaiveDate, Utc};
use ledger_records_store::{StateReader, StateWriter};
use ledger_records_types::{
    KeyedRecord, Permission, Project, Role, RolePermission, Task, User, UserRole,
    config::ValidationConfig,
    snowflake,
    validation::{ValidationError, validate_permission_count, validate_record_id_with_suffix},
};
use snafu::ResultExt;

use crate::{
    error::{IdGenerationSnafu, InvalidArgumentSnafu, Result},
    record::{RecordStore, check_record_id},
};

type Projects = RecordStore<Project>;
type Roles = RecordStore<Role>;
type Permissions = RecordStore<Permission>;
type RolePermissions = RecordStore<RolePermission>;
type Users = RecordStore<User>;
type UserRoles = RecordStore<UserRole>;
type Tasks = RecordStore<Task>;

/// Suffix of the member role created with every project.
pub const USER_ROLE_SUFFIX: &str = "_user";

/// Suffix of the project-manager role created with every project.
pub const PM_ROLE_SUFFIX: &str = "_PM";

fn next_id() -> Result<String> {
    snowflake::generate_record_id().context(IdGenerationSnafu)
}

/// RBAC operations.
#[derive(Debug, Clone, Default)]
pub struct RbacContract {
    validation: ValidationConfig,
}

impl RbacContract {
    /// Creates the contract with the given input limits.
    pub fn new(validation: ValidationConfig) -> Self {
        Self { validation }
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Creates a project together with its `<name>_user` and `<name>_PM` roles.
    ///
    /// `creator_id` is recorded as given; it is not checked against stored users.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` if `name`, or either role name
    /// derived from it, breaks the id rules. Returns
    /// `RecordError::AlreadyExists` if the project or either role exists.
    /// Earlier writes of this call remain in `state`; the transaction must be
    /// discarded, which `Database::execute` does on `Err`.
    pub fn create_project<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        creator_id: &str,
        due_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Project> {
        for suffix in [USER_ROLE_SUFFIX, PM_ROLE_SUFFIX] {
            validate_record_id_with_suffix("name", name, suffix, &self.validation)
                .context(InvalidArgumentSnafu)?;
        }

        let project = Project {
            id: next_id()?,
            name: name.to_string(),
            creator_id: creator_id.to_string(),
            created_at: now,
            due_date,
            active: true,
        };
        Projects::create(state, name, &project)?;

        for suffix in [USER_ROLE_SUFFIX, PM_ROLE_SUFFIX] {
            self.create_role(state, &format!("{name}{suffix}"))?;
        }

        tracing::info!(project = name, id = %project.id, "Created project");
        Ok(project)
    }

    /// Returns a project.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the project does not exist.
    pub fn read_project<S: StateReader + ?Sized>(&self, state: &S, name: &str) -> Result<Project> {
        Projects::read(state, name)
    }

    /// Replaces a project record. The project's roles are not touched.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the project does not exist.
    pub fn update_project<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        project: &Project,
    ) -> Result<()> {
        Projects::update(state, name, project)
    }

    /// Checks if a project exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn project_exists<S: StateReader + ?Sized>(&self, state: &S, name: &str) -> Result<bool> {
        Projects::exists(state, name)
    }

    /// Lists every project in name order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored project does not decode.
    pub fn get_all_projects<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<Project>>> {
        Projects::collect_all(state)
    }

    /// Activates or deactivates a project.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the project does not exist.
    pub fn change_project_active_status<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        active: bool,
    ) -> Result<Project> {
        let mut project = Projects::read(state, name)?;
        project.active = active;
        Projects::update(state, name, &project)?;
        Ok(project)
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Creates a role with a generated id.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` for a malformed name and
    /// `RecordError::AlreadyExists` if the role exists.
    pub fn create_role<S: StateWriter + ?Sized>(&self, state: &mut S, name: &str) -> Result<Role> {
        check_record_id("name", name, &self.validation)?;
        let role = Role { id: next_id()?, name: name.to_string() };
        Roles::create(state, name, &role)?;
        Ok(role)
    }

    /// Returns a role.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the role does not exist.
    pub fn read_role<S: StateReader + ?Sized>(&self, state: &S, name: &str) -> Result<Role> {
        Roles::read(state, name)
    }

    /// Replaces a role record. Existing grants and assignments keep their
    /// copies of the old record.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the role does not exist.
    pub fn update_role<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        role: &Role,
    ) -> Result<()> {
        Roles::update(state, name, role)
    }

    /// Checks if a role exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn role_exists<S: StateReader + ?Sized>(&self, state: &S, name: &str) -> Result<bool> {
        Roles::exists(state, name)
    }

    /// Lists every role in name order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored role does not decode.
    pub fn get_all_roles<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<Role>>> {
        Roles::collect_all(state)
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    /// Creates a permission with a generated id.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` for a malformed name and
    /// `RecordError::AlreadyExists` if the permission exists.
    pub fn create_permission<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
    ) -> Result<Permission> {
        check_record_id("name", name, &self.validation)?;
        let permission = Permission { id: next_id()?, name: name.to_string() };
        Permissions::create(state, name, &permission)?;
        Ok(permission)
    }

    /// Returns a permission.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the permission does not exist.
    pub fn read_permission<S: StateReader + ?Sized>(
        &self,
        state: &S,
        name: &str,
    ) -> Result<Permission> {
        Permissions::read(state, name)
    }

    /// Replaces a permission record.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the permission does not exist.
    pub fn update_permission<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        name: &str,
        permission: &Permission,
    ) -> Result<()> {
        Permissions::update(state, name, permission)
    }

    /// Checks if a permission exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn permission_exists<S: StateReader + ?Sized>(
        &self,
        state: &S,
        name: &str,
    ) -> Result<bool> {
        Permissions::exists(state, name)
    }

    /// Lists every permission in name order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored permission does not decode.
    pub fn get_all_permissions<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<Permission>>> {
        Permissions::collect_all(state)
    }

    // =========================================================================
    // Grants
    // =========================================================================

    /// Grants a list of permissions to a role.
    ///
    /// The grant is a new [`RolePermission`] under a generated id, holding the
    /// permissions exactly as given. The permissions are not looked up and the
    /// role record itself is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` if the list exceeds the
    /// configured maximum and `RecordError::NotFound` if the role does not
    /// exist.
    pub fn assign_permissions<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        role_name: &str,
        permissions: Vec<Permission>,
    ) -> Result<RolePermission> {
        validate_permission_count(permissions.len(), &self.validation)
            .context(InvalidArgumentSnafu)?;
        let role = Roles::read(state, role_name)?;

        let grant = RolePermission { id: next_id()?, role_id: role.id, permissions };
        RolePermissions::create(state, &grant.id, &grant)?;

        tracing::debug!(
            role = role_name,
            grant = %grant.id,
            permissions = grant.permissions.len(),
            "Assigned permissions"
        );
        Ok(grant)
    }

    /// Returns a grant.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the grant does not exist.
    pub fn read_role_permission<S: StateReader + ?Sized>(
        &self,
        state: &S,
        id: &str,
    ) -> Result<RolePermission> {
        RolePermissions::read(state, id)
    }

    /// Checks if a grant exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn role_permission_exists<S: StateReader + ?Sized>(
        &self,
        state: &S,
        id: &str,
    ) -> Result<bool> {
        RolePermissions::exists(state, id)
    }

    /// Lists every grant in id order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored grant does not decode.
    pub fn get_all_role_permissions<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<RolePermission>>> {
        RolePermissions::collect_all(state)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Creates an active user.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidArgument` for a malformed uid and
    /// `RecordError::AlreadyExists` if the user exists.
    pub fn create_user<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        uid: &str,
        user_type: &str,
        pub_key: &str,
    ) -> Result<User> {
        check_record_id("uid", uid, &self.validation)?;
        let user = User {
            uid: uid.to_string(),
            active: true,
            user_type: user_type.to_string(),
            pub_key: pub_key.to_string(),
        };
        Users::create(state, uid, &user)?;
        Ok(user)
    }

    /// Returns a user.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user does not exist.
    pub fn read_user<S: StateReader + ?Sized>(&self, state: &S, uid: &str) -> Result<User> {
        Users::read(state, uid)
    }

    /// Checks if a user exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn user_exists<S: StateReader + ?Sized>(&self, state: &S, uid: &str) -> Result<bool> {
        Users::exists(state, uid)
    }

    /// Lists every user in uid order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored user does not decode.
    pub fn get_all_users<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<User>>> {
        Users::collect_all(state)
    }

    /// Activates or deactivates a user.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the user does not exist.
    pub fn change_user_active_status<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        uid: &str,
        active: bool,
    ) -> Result<User> {
        let mut user = Users::read(state, uid)?;
        user.active = active;
        Users::update(state, uid, &user)?;
        Ok(user)
    }

    // =========================================================================
    // Assignments
    // =========================================================================

    /// Assigns a role to a user within a project.
    ///
    /// The assignment embeds a copy of the role as it is now. `user_id` is
    /// recorded as given.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the project or the role does not
    /// exist.
    pub fn assign_role<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        project: &str,
        user_id: &str,
        role_name: &str,
    ) -> Result<UserRole> {
        let project = Projects::read(state, project)?;
        let role = Roles::read(state, role_name)?;

        let assignment = UserRole {
            id: next_id()?,
            project_id: project.name,
            user_id: user_id.to_string(),
            role,
        };
        UserRoles::create(state, &assignment.id, &assignment)?;

        tracing::debug!(
            project = %assignment.project_id,
            user = user_id,
            role = role_name,
            "Assigned role"
        );
        Ok(assignment)
    }

    /// Returns an assignment.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the assignment does not exist.
    pub fn read_user_role<S: StateReader + ?Sized>(&self, state: &S, id: &str) -> Result<UserRole> {
        UserRoles::read(state, id)
    }

    /// Checks if an assignment exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn user_role_exists<S: StateReader + ?Sized>(&self, state: &S, id: &str) -> Result<bool> {
        UserRoles::exists(state, id)
    }

    /// Lists every assignment in id order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored assignment does not decode.
    pub fn get_all_user_roles<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<UserRole>>> {
        UserRoles::collect_all(state)
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Creates an active task in an existing project.
    ///
    /// `creator_id`, `assignee_id` and `responsible_id` are recorded as given.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the project does not exist.
    #[allow(clippy::too_many_arguments)]
    pub fn create_task<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        project: &str,
        creator_id: &str,
        assignee_id: &str,
        responsible_id: &str,
        due_date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let project = Projects::read(state, project)?;

        let task = Task {
            id: next_id()?,
            project_id: project.name,
            creator_id: creator_id.to_string(),
            assignee_id: assignee_id.to_string(),
            responsible_id: responsible_id.to_string(),
            created_at: now,
            due_date,
            completed_at: None,
            active: true,
        };
        Tasks::create(state, &task.id, &task)?;

        tracing::debug!(project = %task.project_id, id = %task.id, "Created task");
        Ok(task)
    }

    /// Returns a task.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the task does not exist.
    pub fn read_task<S: StateReader + ?Sized>(&self, state: &S, id: &str) -> Result<Task> {
        Tasks::read(state, id)
    }

    /// Checks if a task exists.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StoreUnavailable` if the store read fails.
    pub fn task_exists<S: StateReader + ?Sized>(&self, state: &S, id: &str) -> Result<bool> {
        Tasks::exists(state, id)
    }

    /// Lists every task in id order.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::Decode` if any stored task does not decode.
    pub fn get_all_tasks<S: StateReader + ?Sized>(
        &self,
        state: &S,
    ) -> Result<Vec<KeyedRecord<Task>>> {
        Tasks::collect_all(state)
    }

    /// Marks a task completed at `now` and deactivates it.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the task does not exist and
    /// `RecordError::InvalidArgument` if it is already completed.
    pub fn complete_task<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        let mut task = Tasks::read(state, id)?;
        if let Some(completed_at) = task.completed_at {
            return Err(ValidationError {
                field: "id".to_string(),
                constraint: format!("task was already completed at {completed_at}"),
            })
            .context(InvalidArgumentSnafu);
        }
        task.completed_at = Some(now);
        task.active = false;
        Tasks::update(state, id, &task)?;
        Ok(task)
    }

    /// Activates or deactivates a task. Completion is not changed.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::NotFound` if the task does not exist.
    pub fn change_task_active_status<S: StateWriter + ?Sized>(
        &self,
        state: &mut S,
        id: &str,
        active: bool,
    ) -> Result<Task> {
        let mut task = Tasks::read(state, id)?;
        task.active = active;
        Tasks::update(state, id, &task)?;
        Ok(task)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use chrono::TimeZone;
    use ledger_records_store::Database;

    use super::*;
    use crate::RecordError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    fn perm(name: &str) -> Permission {
        Permission { id: String::new(), name: name.to_string() }
    }

    #[test]
    fn test_create_project_creates_roles() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let due = NaiveDate::from_ymd_opt(2024, 12, 31);
        let project =
            db.execute(|txn| rbac.create_project(txn, "Acme", "u1", due, now())).unwrap();

        assert_eq!(project.name, "Acme");
        assert_eq!(project.creator_id, "u1");
        assert_eq!(project.due_date, due);
        assert!(project.active);
        assert!(project.id.parse::<u64>().is_ok());

        let read = db.read();
        assert_eq!(rbac.read_project(&read, "Acme").unwrap(), project);
        assert!(rbac.role_exists(&read, "Acme_user").unwrap());
        assert!(rbac.role_exists(&read, "Acme_PM").unwrap());
        assert_eq!(rbac.get_all_roles(&read).unwrap().len(), 2);
    }

    #[test]
    fn test_create_project_twice_fails() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        db.execute(|txn| rbac.create_project(txn, "Acme", "u1", None, now())).unwrap();
        let err =
            db.execute(|txn| rbac.create_project(txn, "Acme", "u2", None, now())).unwrap_err();
        assert!(matches!(err, RecordError::AlreadyExists { kind: "project", .. }));
        assert_eq!(rbac.read_project(&db.read(), "Acme").unwrap().creator_id, "u1");
    }

    #[test]
    fn test_create_project_role_collision_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        db.execute(|txn| rbac.create_role(txn, "Acme_PM")).unwrap();

        let err =
            db.execute(|txn| rbac.create_project(txn, "Acme", "u1", None, now())).unwrap_err();
        assert!(matches!(
            err,
            RecordError::AlreadyExists { kind: "role", ref key } if key == "Acme_PM"
        ));

        let read = db.read();
        assert!(!rbac.project_exists(&read, "Acme").unwrap());
        assert!(!rbac.role_exists(&read, "Acme_user").unwrap());
        assert_eq!(rbac.get_all_roles(&read).unwrap().len(), 1);
    }

    #[test]
    fn test_change_project_active_status() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        rbac.create_project(&mut txn, "Acme", "u1", None, now()).unwrap();

        let closed = rbac.change_project_active_status(&mut txn, "Acme", false).unwrap();
        assert!(!closed.active);
        assert!(!rbac.read_project(&txn, "Acme").unwrap().active);
        assert!(matches!(
            rbac.change_project_active_status(&mut txn, "Nope", true),
            Err(RecordError::NotFound { kind: "project", .. })
        ));
    }

    #[test]
    fn test_update_project_replaces_record() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        let mut project = rbac.create_project(&mut txn, "Acme", "u1", None, now()).unwrap();
        project.due_date = NaiveDate::from_ymd_opt(2025, 1, 15);
        rbac.update_project(&mut txn, "Acme", &project).unwrap();
        assert_eq!(rbac.read_project(&txn, "Acme").unwrap(), project);
    }

    #[test]
    fn test_roles_and_permissions_crud() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();

        let role = rbac.create_role(&mut txn, "auditor").unwrap();
        let permission = rbac.create_permission(&mut txn, "read_reports").unwrap();
        assert_ne!(role.id, permission.id);
        assert!(rbac.permission_exists(&txn, "read_reports").unwrap());

        let renamed = Role { id: role.id.clone(), name: "auditor2".to_string() };
        rbac.update_role(&mut txn, "auditor", &renamed).unwrap();
        assert_eq!(rbac.read_role(&txn, "auditor").unwrap(), renamed);

        let edited = Permission { id: permission.id.clone(), name: "read_all".to_string() };
        rbac.update_permission(&mut txn, "read_reports", &edited).unwrap();
        assert_eq!(rbac.read_permission(&txn, "read_reports").unwrap(), edited);
        assert_eq!(rbac.get_all_permissions(&txn).unwrap().len(), 1);

        assert!(matches!(
            rbac.create_permission(&mut txn, "read_reports"),
            Err(RecordError::AlreadyExists { .. })
        ));
        assert!(matches!(
            rbac.update_role(&mut txn, "ghost", &renamed),
            Err(RecordError::NotFound { .. })
        ));
    }

    #[test]
    fn test_assign_permissions_shape() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        let role = rbac.create_role(&mut txn, "R").unwrap();

        let permissions = vec![perm("a"), perm("b")];
        let grant = rbac.assign_permissions(&mut txn, "R", permissions.clone()).unwrap();
        assert_eq!(grant.role_id, role.id);
        assert_eq!(grant.permissions, permissions);

        assert!(rbac.role_permission_exists(&txn, &grant.id).unwrap());
        assert_eq!(rbac.read_role_permission(&txn, &grant.id).unwrap(), grant);
        // The role record is not modified by a grant
        assert_eq!(rbac.read_role(&txn, "R").unwrap(), role);
        // Granted permissions are not required to exist
        assert!(!rbac.permission_exists(&txn, "a").unwrap());
    }

    #[test]
    fn test_assign_permissions_to_missing_role() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let err = db
            .execute(|txn| rbac.assign_permissions(txn, "ghost", vec![perm("a")]))
            .unwrap_err();
        assert!(matches!(err, RecordError::NotFound { kind: "role", .. }));
        assert!(rbac.get_all_role_permissions(&db.read()).unwrap().is_empty());
    }

    #[test]
    fn test_assign_permissions_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        let config = ValidationConfig { max_permissions_per_grant: 1, ..Default::default() };
        let rbac = RbacContract::new(config);
        let mut txn = db.write();
        rbac.create_role(&mut txn, "R").unwrap();
        assert!(matches!(
            rbac.assign_permissions(&mut txn, "R", vec![perm("a"), perm("b")]),
            Err(RecordError::InvalidArgument { .. })
        ));
        assert!(rbac.assign_permissions(&mut txn, "R", Vec::new()).is_ok());
    }

    #[test]
    fn test_grants_are_snapshots() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        rbac.create_role(&mut txn, "R").unwrap();
        let stored = rbac.create_permission(&mut txn, "approve").unwrap();
        let grant = rbac.assign_permissions(&mut txn, "R", vec![stored.clone()]).unwrap();

        let edited = Permission { id: stored.id, name: "approve_all".to_string() };
        rbac.update_permission(&mut txn, "approve", &edited).unwrap();

        let reread = rbac.read_role_permission(&txn, &grant.id).unwrap();
        assert_eq!(reread.permissions[0].name, "approve");
    }

    #[test]
    fn test_users() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();

        let user = rbac.create_user(&mut txn, "u1", "employee", "pk1").unwrap();
        assert!(user.active);
        assert!(rbac.user_exists(&txn, "u1").unwrap());

        let inactive = rbac.change_user_active_status(&mut txn, "u1", false).unwrap();
        assert!(!inactive.active);
        assert_eq!(rbac.read_user(&txn, "u1").unwrap(), inactive);
        assert_eq!(rbac.get_all_users(&txn).unwrap().len(), 1);

        assert!(matches!(
            rbac.create_user(&mut txn, "u1", "x", "y"),
            Err(RecordError::AlreadyExists { kind: "user", .. })
        ));
        assert!(matches!(
            rbac.change_user_active_status(&mut txn, "u2", true),
            Err(RecordError::NotFound { .. })
        ));
    }

    #[test]
    fn test_assign_role() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        rbac.create_project(&mut txn, "Acme", "u1", None, now()).unwrap();
        let pm = rbac.read_role(&txn, "Acme_PM").unwrap();

        let assignment = rbac.assign_role(&mut txn, "Acme", "u1", "Acme_PM").unwrap();
        assert_eq!(assignment.project_id, "Acme");
        assert_eq!(assignment.user_id, "u1");
        assert_eq!(assignment.role, pm);
        assert!(rbac.user_role_exists(&txn, &assignment.id).unwrap());
        assert_eq!(rbac.read_user_role(&txn, &assignment.id).unwrap(), assignment);
        assert_eq!(rbac.get_all_user_roles(&txn).unwrap().len(), 1);

        assert!(matches!(
            rbac.assign_role(&mut txn, "Nope", "u1", "Acme_PM"),
            Err(RecordError::NotFound { kind: "project", .. })
        ));
        assert!(matches!(
            rbac.assign_role(&mut txn, "Acme", "u1", "Acme_admin"),
            Err(RecordError::NotFound { kind: "role", .. })
        ));
    }

    #[test]
    fn test_create_rejects_bad_names() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        assert!(matches!(
            rbac.create_project(&mut txn, "a/b", "u1", None, now()),
            Err(RecordError::InvalidArgument { .. })
        ));
        assert!(matches!(rbac.create_role(&mut txn, ""), Err(RecordError::InvalidArgument { .. })));
        assert!(matches!(
            rbac.create_user(&mut txn, "bad\nuid", "x", "y"),
            Err(RecordError::InvalidArgument { .. })
        ));
        assert_eq!(txn.pending_writes(), 0);
    }

    #[test]
    fn test_create_project_rejects_name_without_room_for_role_suffix() {
        let db = Database::open_in_memory().unwrap();
        let config = ValidationConfig { max_key_bytes: 10, ..Default::default() };
        let rbac = RbacContract::new(config);
        let mut txn = db.write();

        let err = rbac.create_project(&mut txn, "Acmeco", "u1", None, now()).unwrap_err();
        let RecordError::InvalidArgument { source } = err else {
            panic!("expected InvalidArgument");
        };
        assert_eq!(source.field, "name");
        assert!(source.constraint.starts_with("length 6 bytes"), "{}", source.constraint);
        assert!(source.constraint.contains("'_user'"));
        assert_eq!(txn.pending_writes(), 0);

        rbac.create_project(&mut txn, "Acmec", "u1", None, now()).unwrap();
        assert!(rbac.role_exists(&txn, "Acmec_user").unwrap());
    }

    #[test]
    fn test_tasks() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let mut txn = db.write();
        rbac.create_project(&mut txn, "Acme", "u1", None, now()).unwrap();

        let due = NaiveDate::from_ymd_opt(2024, 6, 1);
        let task = rbac.create_task(&mut txn, "Acme", "u1", "u2", "u1", due, now()).unwrap();
        assert_eq!(task.project_id, "Acme");
        assert_eq!(task.assignee_id, "u2");
        assert_eq!(task.due_date, due);
        assert!(task.active);
        assert_eq!(task.completed_at, None);
        assert!(rbac.task_exists(&txn, &task.id).unwrap());
        assert_eq!(rbac.read_task(&txn, &task.id).unwrap(), task);

        let paused = rbac.change_task_active_status(&mut txn, &task.id, false).unwrap();
        assert!(!paused.active);
        assert_eq!(paused.completed_at, None);

        let done_at = Utc.with_ymd_and_hms(2024, 5, 20, 17, 30, 0).unwrap();
        let done = rbac.complete_task(&mut txn, &task.id, done_at).unwrap();
        assert_eq!(done.completed_at, Some(done_at));
        assert!(!done.active);
        assert!(matches!(
            rbac.complete_task(&mut txn, &task.id, now()),
            Err(RecordError::InvalidArgument { .. })
        ));
        assert_eq!(rbac.read_task(&txn, &task.id).unwrap().completed_at, Some(done_at));

        let tasks = rbac.get_all_tasks(&txn).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].key, task.id);
    }

    #[test]
    fn test_task_requires_project() {
        let db = Database::open_in_memory().unwrap();
        let rbac = RbacContract::default();
        let err = db
            .execute(|txn| rbac.create_task(txn, "Nope", "u1", "u2", "u1", None, now()))
            .unwrap_err();
        assert!(matches!(err, RecordError::NotFound { kind: "project", .. }));
        assert!(rbac.get_all_tasks(&db.read()).unwrap().is_empty());

        let mut txn = db.write();
        assert!(matches!(
            rbac.complete_task(&mut txn, "42", now()),
            Err(RecordError::NotFound { kind: "task", .. })
        ));
    }
}
