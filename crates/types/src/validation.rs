//! Input validation for invocation arguments.
//!
//! Record ids become the suffix of a `<kind>/<id>` store key, so they must be
//! non-empty, bounded and free of `/` (which would let an id escape its kind's
//! key range) and of control characters (which would corrupt log output).
//! Any other Unicode is accepted: party names and project names are
//! human-readable.

use std::fmt;

use crate::config::ValidationConfig;

/// Validation error with structured context.
///
/// Contains the specific constraint that was violated and the field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// Description of the violated constraint.
    pub constraint: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

impl std::error::Error for ValidationError {}

/// Validates a record id against configured limits.
///
/// Record ids must:
/// - Be non-empty
/// - Not exceed `config.max_key_bytes` in UTF-8 byte length
/// - Not contain `/` or control characters
///
/// # Errors
///
/// Returns [`ValidationError`] naming `field` if any rule is violated.
pub fn validate_record_id(
    field: &str,
    id: &str,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: "must not be empty".to_string(),
        });
    }
    if id.len() > config.max_key_bytes {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "length {} bytes exceeds maximum {} bytes",
                id.len(),
                config.max_key_bytes
            ),
        });
    }
    if let Some((pos, c)) = id.char_indices().find(|&(_, c)| c == '/' || c.is_control()) {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "contains invalid character {c:?} at byte offset {pos}; '/' and control characters are not allowed"
            ),
        });
    }
    Ok(())
}

/// Validates a record id that also prefixes derived ids built by appending
/// `suffix`, so the derived id must fit the same byte limit.
///
/// # Errors
///
/// Returns [`ValidationError`] naming `field` if `id` fails
/// [`validate_record_id`] or leaves no room for `suffix`.
pub fn validate_record_id_with_suffix(
    field: &str,
    id: &str,
    suffix: &str,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    validate_record_id(field, id, config)?;
    if id.len() + suffix.len() > config.max_key_bytes {
        return Err(ValidationError {
            field: field.to_string(),
            constraint: format!(
                "length {} bytes exceeds maximum {} bytes once '{suffix}' is appended",
                id.len(),
                config.max_key_bytes.saturating_sub(suffix.len())
            ),
        });
    }
    Ok(())
}

/// Validates the number of permissions in a single grant.
///
/// An empty grant is allowed.
///
/// # Errors
///
/// Returns [`ValidationError`] if `count` exceeds `max_permissions_per_grant`.
pub fn validate_permission_count(
    count: usize,
    config: &ValidationConfig,
) -> Result<(), ValidationError> {
    if count > config.max_permissions_per_grant {
        return Err(ValidationError {
            field: "permissions".to_string(),
            constraint: format!(
                "count {count} exceeds maximum {}",
                config.max_permissions_per_grant
            ),
        });
    }
    Ok(())
}
