//! Core types for ledger records.
//!
//! This crate provides the foundational pieces shared by every contract:
//! - Record types (Party, RealEstate, Project, Role, Permission, ...) and the
//!   [`Record`] trait that binds each type to its key prefix
//! - JSON entity codec with snafu errors
//! - Snowflake id generation for generated record identifiers
//! - Input validation and configuration types
//! - Machine-readable error codes

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod records;
pub mod snowflake;
pub mod validation;

pub use codec::{CodecError, decode, encode};
pub use error::ErrorCode;
pub use records::*;
