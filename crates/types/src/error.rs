//! Machine-readable error codes.
//!
//! Every error surfaced at the invocation boundary maps to an [`ErrorCode`]
//! with a stable numeric identifier, a retryability classification and a
//! suggested recovery action.

use core::fmt;

/// Machine-readable error codes for programmatic error handling.
///
/// Codes are organized into ranges:
///
/// | Range       | Domain      | Examples                                  |
/// |-------------|-------------|-------------------------------------------|
/// | 1000–1099   | Storage     | Store unavailable, commit failure         |
/// | 1100–1199   | Storage I/O | Snapshot corruption                       |
/// | 3100–3199   | Application | Record not found, record already exists   |
/// | 3200–3299   | Application | Serialization, config, invalid argument   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Storage errors (1000–1199) ---
    /// The underlying store could not be read or written.
    StorageUnavailable = 1000,
    /// Persisted state failed verification (checksum, magic, version).
    StorageCorruption = 1101,

    // --- Application errors (3100–3299) ---
    /// Read, update, delete or assignment against an absent key.
    AppNotFound = 3100,
    /// Create against a key that is already present.
    AppAlreadyExists = 3101,
    /// Stored bytes do not match the expected record shape, or encoding failed.
    AppSerialization = 3200,
    /// Configuration error.
    AppConfig = 3201,
    /// Invalid invocation argument (malformed key, wrong arity, unparsable value).
    AppInvalidArgument = 3203,
    /// Internal error (id generation, counter overflow).
    AppInternal = 3204,
}

impl ErrorCode {
    /// Returns the numeric code value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Converts a numeric code to an `ErrorCode`, returning `None` for unknown values.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1000 => Some(Self::StorageUnavailable),
            1101 => Some(Self::StorageCorruption),
            3100 => Some(Self::AppNotFound),
            3101 => Some(Self::AppAlreadyExists),
            3200 => Some(Self::AppSerialization),
            3201 => Some(Self::AppConfig),
            3203 => Some(Self::AppInvalidArgument),
            3204 => Some(Self::AppInternal),
            _ => None,
        }
    }

    /// Short name of the error kind, stable across releases.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StorageUnavailable => "StoreUnavailable",
            Self::StorageCorruption => "StoreCorrupted",
            Self::AppNotFound => "NotFound",
            Self::AppAlreadyExists => "AlreadyExists",
            Self::AppSerialization => "DecodeError",
            Self::AppConfig => "ConfigError",
            Self::AppInvalidArgument => "InvalidArgument",
            Self::AppInternal => "Internal",
        }
    }

    /// Whether this error is retryable.
    ///
    /// Only store availability failures may succeed on a later attempt; every
    /// other code requires a different request or operator action.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::StorageUnavailable)
    }

    /// Suggested recovery action for this error code.
    #[must_use]
    pub const fn suggested_action(self) -> &'static str {
        match self {
            Self::StorageUnavailable => {
                "Retry once other invocations release the data file and the disk is healthy."
            },
            Self::StorageCorruption => {
                "Restore the data file from a backup. The snapshot failed checksum or format checks."
            },
            Self::AppNotFound => "Create the record first, or check the key for typos.",
            Self::AppAlreadyExists => "Use the update operation, or pick a different key.",
            Self::AppSerialization => {
                "The stored record does not match its type. Inspect the key for corruption."
            },
            Self::AppConfig => "Fix the configuration value and rerun.",
            Self::AppInvalidArgument => "Fix the invocation arguments and resubmit.",
            Self::AppInternal => "Unexpected state. Collect context and report as an issue.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
