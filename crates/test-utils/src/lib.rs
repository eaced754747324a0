//! Shared test utilities for ledger-records crates.
//!
//! This crate provides common test helpers to reduce boilerplate across test modules:
//!
//! - [`TestDir`] - Managed temporary directory with path helpers
//! - [`strategies`] - Proptest generators for every record type
//! - [`test_validation_config`] - Tight validation limits for tests

#![deny(unsafe_code)]
// Test utilities are allowed to use unwrap for simplicity
#![cfg_attr(test, allow(clippy::disallowed_methods))]

mod test_dir;
pub use test_dir::TestDir;

mod config;
pub use config::test_validation_config;

pub mod strategies;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    // ============================================
    // TestDir tests
    // ============================================

    #[test]
    fn test_dir_creates_temp_directory() {
        let dir = TestDir::new();
        assert!(dir.path().exists(), "temp directory should exist");
        assert!(dir.path().is_dir(), "should be a directory");
    }

    #[test]
    fn test_dir_join_stays_inside() {
        let dir = TestDir::new();
        let subpath = dir.join("nested/records.ldb");
        assert!(subpath.starts_with(dir.path()));
        assert!(subpath.ends_with("nested/records.ldb"));
    }

    #[test]
    fn test_dir_cleanup_on_drop() {
        let path = {
            let dir = TestDir::new();
            let p = dir.path().to_path_buf();
            std::fs::write(p.join("file.txt"), "data").expect("write file");
            assert!(p.exists());
            p
        };
        assert!(!path.exists(), "temp directory should be cleaned up on drop");
    }

    // ============================================
    // Config helper tests
    // ============================================

    #[test]
    fn test_validation_config_is_valid() {
        let config = test_validation_config();
        assert!(config.validate().is_ok());
        assert!(config.max_key_bytes < 256, "tighter than the default");
    }
}
