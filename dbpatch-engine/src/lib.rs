//! # dbpatch-engine
//!
//! The orchestrator and everything that feeds it.
//!
//! Build a [`UnitRegistry`](dbpatch_core::UnitRegistry) (for example with
//! [`register_sql_patches`]), open the [`Connections`](dbpatch_core::Connections),
//! then drive a [`Patcher`] through apply, rollback, reset, refresh or status.

pub mod error;
pub mod loader;
pub mod note;
pub mod patcher;
pub mod scaffold;

pub use error::EngineError;
pub use loader::{register_sql_patches, SqlPatch};
pub use note::Note;
pub use patcher::{
    ApplyOptions, PatchStatus, Patcher, RefreshOptions, RefreshReport, ResetOptions,
    RollbackOptions,
};
pub use scaffold::{make_patch, MakeOptions};
