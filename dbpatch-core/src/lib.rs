//! dbpatch core library — domain types, scanner, ledger, unit registry,
//! connections and settings.
//!
//! - [`types`] — [`PatchId`], [`LedgerEntry`], batches
//! - [`error`] — [`PatchError`]
//! - [`scanner`] — patch discovery
//! - [`ledger`] — the applied-patches table
//! - [`unit`] — [`PatchUnit`] and [`UnitRegistry`]
//! - [`executor`] — live and pretend statement sinks
//! - [`connection`] — named SQLite connections
//! - [`config`] — `dbpatch.yaml` load / save

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod scanner;
pub mod types;
pub mod unit;

pub use config::Settings;
pub use connection::Connections;
pub use error::PatchError;
pub use executor::{Executor, LiveExecutor, PretendExecutor};
pub use ledger::Ledger;
pub use scanner::{ScannedPatches, Scanner};
pub use types::{Batch, Direction, LedgerEntry, PatchId};
pub use unit::{PatchUnit, UnitError, UnitFactory, UnitRegistry, UnitResult};
