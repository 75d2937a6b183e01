//! Error types for dbpatch-engine.

use std::path::PathBuf;

use thiserror::Error;

use dbpatch_core::{Direction, PatchError, PatchId, UnitError};

/// All errors that can arise from orchestrator runs, loading and scaffolding.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Scanner, ledger, resolver, connection or settings failure.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// A unit's action failed. Its transaction (if any) was rolled back and
    /// the rest of the run was abandoned.
    #[error("patch '{id}' failed running {direction}: {source}")]
    Execution {
        id: PatchId,
        direction: Direction,
        #[source]
        source: UnitError,
    },

    /// A SQL patch file could not be parsed.
    #[error("invalid patch file {path}: {reason}")]
    InvalidPatchFile { path: PathBuf, reason: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scaffolding refused to overwrite an existing file.
    #[error("patch file already exists at {path}")]
    PatchExists { path: PathBuf },

    /// Tera template engine error.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Convenience constructor for [`EngineError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}
