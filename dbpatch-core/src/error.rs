//! Error types for dbpatch-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Batch, PatchId};

/// All errors that can arise from scanning, ledger, resolver and config operations.
#[derive(Debug, Error)]
pub enum PatchError {
    /// A scan location exists but could not be read.
    #[error("cannot scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ledger table has not been provisioned on this connection.
    #[error("patch table '{table}' not found; run `dbpatch install` first")]
    StoreMissing { table: String },

    /// The identifier does not map to any registered unit.
    #[error("cannot resolve patch '{id}': {reason}")]
    UnitResolution { id: PatchId, reason: String },

    /// The identifier already has a ledger entry.
    #[error("patch '{id}' is already recorded in the ledger")]
    DuplicateEntry { id: PatchId },

    /// The ledger's batch counter cannot grow past its highest value.
    #[error("batch number overflow after batch {batch}")]
    BatchOverflow { batch: Batch },

    /// A unit or invocation asked for a connection that is not configured.
    #[error("unknown connection '{name}'")]
    UnknownConnection { name: String },

    /// Ledger table names are interpolated into SQL, so they are restricted
    /// to plain identifiers.
    #[error("invalid ledger table name '{0}'")]
    InvalidTableName(String),

    /// SQLite failure from the ledger or a connection.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// YAML serialization error (settings save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the offending file.
    #[error("failed to parse settings at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Convenience constructor for [`PatchError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PatchError {
    PatchError::Io {
        path: path.into(),
        source,
    }
}
