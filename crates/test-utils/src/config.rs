//! Test configuration helpers.
//!
//! Provides small, valid configurations for tests so limits are exercised
//! without building huge inputs.

use ledger_records_types::config::ValidationConfig;

/// Returns a validation configuration with tight limits suitable for tests.
///
/// - `max_key_bytes`: 64 (long ids are cheap to construct)
/// - `max_permissions_per_grant`: 8 (oversized grants are easy to build)
#[must_use]
pub fn test_validation_config() -> ValidationConfig {
    ValidationConfig { max_key_bytes: 64, max_permissions_per_grant: 8 }
}
