//! Generated record identifiers.
//!
//! Project, role and permission ids, grant keys and assignment keys are
//! 64-bit snowflake ids rendered in decimal:
//!
//! ```text
//! | 42 bits: ms since 2024-01-01 UTC | 12 bits: worker | 10 bits: sequence |
//! ```
//!
//! Ids from one process strictly increase. The worker bits come from OS
//! entropy mixed with the PID, which separates concurrent processes minting
//! ids in the same millisecond.

use std::{
    sync::OnceLock,
    time::{SystemTime, UNIX_EPOCH},
};

use parking_lot::Mutex;
use snafu::Snafu;

/// 2024-01-01 00:00:00 UTC in milliseconds since the Unix epoch.
const EPOCH_MS: u64 = 1_704_067_200_000;

const WORKER_BITS: u32 = 12;
const SEQUENCE_BITS: u32 = 10;
const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

/// Errors from id generation.
#[derive(Debug, Snafu)]
pub enum SnowflakeError {
    /// System clock is before the Unix epoch.
    #[snafu(display("system clock is before Unix epoch"))]
    SystemClock,
}

/// Issues strictly increasing ids for one worker.
///
/// Time is logical. When the wall clock is behind the last tick, or a tick
/// runs out of sequence numbers, the generator counts on from its last tick
/// instead of waiting.
struct IdGenerator {
    worker: u64,
    /// Last tick and sequence handed out.
    last: Mutex<(u64, u64)>,
}

impl IdGenerator {
    fn new(worker: u64) -> Self {
        Self { worker: worker & ((1 << WORKER_BITS) - 1), last: Mutex::new((0, 0)) }
    }

    /// Next id given the wall clock in ms since [`EPOCH_MS`].
    fn next_at(&self, now: u64) -> u64 {
        let mut last = self.last.lock();
        let (tick, seq) = match *last {
            (tick, seq) if now <= tick && seq < MAX_SEQUENCE => (tick, seq + 1),
            (tick, _) if now <= tick => (tick + 1, 0),
            _ => (now, 0),
        };
        *last = (tick, seq);
        (tick << (WORKER_BITS + SEQUENCE_BITS)) | (self.worker << SEQUENCE_BITS) | seq
    }
}

fn process_generator() -> &'static IdGenerator {
    static GENERATOR: OnceLock<IdGenerator> = OnceLock::new();
    GENERATOR.get_or_init(|| {
        use rand::Rng;
        IdGenerator::new(rand::rng().random::<u64>() ^ u64::from(std::process::id()))
    })
}

/// Generates a new id from the process-wide generator.
///
/// # Errors
///
/// Returns [`SnowflakeError::SystemClock`] if the system clock is before the
/// Unix epoch.
pub fn generate() -> Result<u64, SnowflakeError> {
    let now =
        SystemTime::now().duration_since(UNIX_EPOCH).map_err(|_| SnowflakeError::SystemClock)?;
    let now_ms = u64::try_from(now.as_millis()).unwrap_or(u64::MAX);
    Ok(process_generator().next_at(now_ms.saturating_sub(EPOCH_MS)))
}

/// Generates a new record identifier rendered as a decimal string.
///
/// # Errors
///
/// Returns [`SnowflakeError::SystemClock`] if the system clock is before the
/// Unix epoch.
pub fn generate_record_id() -> Result<String, SnowflakeError> {
    generate().map(|id| id.to_string())
}
