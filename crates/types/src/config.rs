//! Configuration types for the record contracts.
//!
//! Configuration is loaded from TOML files and environment variables by the
//! binary. All config structs validate their values at construction time via
//! fallible builders. Post-deserialization validation is available via
//! the [`validate`](ValidationConfig::validate) method.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

/// Configuration validation error.
///
/// Returned when a configuration value is outside its valid range.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// A configuration value is invalid.
    #[snafu(display("invalid config: {message}"))]
    Validation {
        /// Description of the validation failure.
        message: String,
    },
}

/// Input validation limits applied by every contract operation.
///
/// # Example
///
/// ```no_run
/// # use ledger_records_types::config::ValidationConfig;
/// let config = ValidationConfig::builder()
///     .max_key_bytes(512)
///     .max_permissions_per_grant(64)
///     .build()
///     .expect("valid validation config");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationConfig {
    /// Maximum record id size in bytes.
    ///
    /// Ids exceeding this limit are rejected with `InvalidArgument`.
    /// Must be >= 1. Default: 256.
    #[serde(default = "default_max_key_bytes")]
    pub max_key_bytes: usize,
    /// Maximum number of permissions in a single `assign_permissions` grant.
    ///
    /// Must be >= 1. Default: 1024.
    #[serde(default = "default_max_permissions_per_grant")]
    pub max_permissions_per_grant: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_key_bytes: default_max_key_bytes(),
            max_permissions_per_grant: default_max_permissions_per_grant(),
        }
    }
}

#[bon::bon]
impl ValidationConfig {
    /// Creates a new validation configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is zero.
    #[builder]
    pub fn new(
        #[builder(default = default_max_key_bytes())] max_key_bytes: usize,
        #[builder(default = default_max_permissions_per_grant())] max_permissions_per_grant: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { max_key_bytes, max_permissions_per_grant };
        config.validate()?;
        Ok(config)
    }
}

impl ValidationConfig {
    /// Validates the configuration values.
    ///
    /// Call after deserialization to ensure all limits are positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if any limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_key_bytes == 0 {
            return Err(ConfigError::Validation {
                message: "max_key_bytes must be >= 1".to_string(),
            });
        }
        if self.max_permissions_per_grant == 0 {
            return Err(ConfigError::Validation {
                message: "max_permissions_per_grant must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_max_key_bytes() -> usize {
    256
}

fn default_max_permissions_per_grant() -> usize {
    1024
}
