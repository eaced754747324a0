//! Errors returned by the record accessor and the contracts.

use ledger_records_types::{
    CodecError, ErrorCode, snowflake::SnowflakeError, validation::ValidationError,
};
use snafu::Snafu;

/// Errors returned by [`RecordStore`](crate::RecordStore) and every contract
/// operation.
///
/// Each error carries the offending record kind and id where one exists.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RecordError {
    /// Create against a key that is already present.
    #[snafu(display("{kind} '{key}' already exists"))]
    AlreadyExists {
        /// Record kind.
        kind: &'static str,
        /// Record id.
        key: String,
    },

    /// Read, update, delete or assignment against an absent key.
    #[snafu(display("{kind} '{key}' does not exist"))]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// Record id.
        key: String,
    },

    /// Stored bytes do not decode as the expected record type.
    #[snafu(display("Failed to decode {kind} '{key}': {source}"))]
    Decode {
        /// Record kind.
        kind: &'static str,
        /// Record id.
        key: String,
        /// Underlying codec error.
        source: CodecError,
    },

    /// A record could not be encoded.
    #[snafu(display("Failed to encode {kind} '{key}': {source}"))]
    Encode {
        /// Record kind.
        kind: &'static str,
        /// Record id.
        key: String,
        /// Underlying codec error.
        source: CodecError,
    },

    /// The underlying store failed.
    #[snafu(display("Store unavailable: {source}"))]
    StoreUnavailable {
        /// Underlying store error.
        source: ledger_records_store::Error,
    },

    /// An argument failed input validation.
    #[snafu(display("Invalid argument {source}"))]
    InvalidArgument {
        /// Which field failed and why.
        source: ValidationError,
    },

    /// A generated identifier could not be produced.
    #[snafu(display("Failed to generate identifier: {source}"))]
    IdGeneration {
        /// Underlying generator error.
        source: SnowflakeError,
    },

    /// Casting a vote would overflow the party's counter.
    #[snafu(display("Vote count for party '{name}' is at its maximum"))]
    VoteOverflow {
        /// Party name.
        name: String,
    },
}

/// Result type for record operations.
pub type Result<T> = std::result::Result<T, RecordError>;

impl RecordError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RecordError::AlreadyExists { .. } => ErrorCode::AppAlreadyExists,
            RecordError::NotFound { .. } => ErrorCode::AppNotFound,
            RecordError::Decode { .. } | RecordError::Encode { .. } => ErrorCode::AppSerialization,
            RecordError::StoreUnavailable { source } if source.is_corruption() => {
                ErrorCode::StorageCorruption
            },
            RecordError::StoreUnavailable { .. } => ErrorCode::StorageUnavailable,
            RecordError::InvalidArgument { .. } => ErrorCode::AppInvalidArgument,
            RecordError::IdGeneration { .. } | RecordError::VoteOverflow { .. } => {
                ErrorCode::AppInternal
            },
        }
    }
}

// Lets contract closures run inside `Database::execute`, whose commit error
// is a store error.
impl From<ledger_records_store::Error> for RecordError {
    fn from(source: ledger_records_store::Error) -> Self {
        RecordError::StoreUnavailable { source }
    }
}
