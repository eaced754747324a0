//! Command-line invocation surface for the ledger-records contracts.
//!
//! Each process run is one invocation: open the store, run one operation in
//! one transaction, print the JSON result, exit.

#![deny(unsafe_code)]

pub mod config;
pub mod invoke;

use ledger_records_state::StorageEngine;
use serde_json::Value;
use snafu::ResultExt;

use crate::{
    config::Config,
    invoke::{Contract, InvokeError, Invoker, StorageSnafu},
};

/// Opens the configured store and runs one operation against it.
///
/// # Errors
///
/// Returns [`InvokeError::Storage`] if the store cannot be opened and any
/// error from [`Invoker::invoke`].
pub fn run(
    config: &Config,
    contract: Contract,
    operation: &str,
    args: &[String],
) -> Result<Value, InvokeError> {
    let engine = StorageEngine::open_with_config(&config.data, config.database_config())
        .context(StorageSnafu)?;
    let db = engine.db();
    Invoker::new(config.validation.clone()).invoke(db.as_ref(), contract, operation, args)
}
