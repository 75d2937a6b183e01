//! Human-readable status lines emitted by the orchestrator.

use std::fmt;

use dbpatch_core::PatchId;

/// One status line. How and where it is printed is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    NothingToPatch,
    NothingToRollback,
    Patching(PatchId),
    Patched(PatchId),
    RollingBack(PatchId),
    RolledBack(PatchId),
    /// A statement captured in pretend mode.
    Statement { unit: String, statement: String },
    /// A ledger entry whose unit is no longer discoverable; it was skipped.
    PatchNotFound(PatchId),
}

impl Note {
    pub fn is_warning(&self) -> bool {
        matches!(self, Note::PatchNotFound(_))
    }

    /// Label part of the line, without the subject.
    pub fn label(&self) -> &'static str {
        match self {
            Note::NothingToPatch => "Nothing to patch.",
            Note::NothingToRollback => "Nothing to rollback.",
            Note::Patching(_) => "Patching:",
            Note::Patched(_) => "Patched: ",
            Note::RollingBack(_) => "Rolling back:",
            Note::RolledBack(_) => "Rolled back: ",
            Note::Statement { .. } => "",
            Note::PatchNotFound(_) => "Patch not found:",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::NothingToPatch | Note::NothingToRollback => f.write_str(self.label()),
            Note::Patching(id)
            | Note::Patched(id)
            | Note::RollingBack(id)
            | Note::RolledBack(id)
            | Note::PatchNotFound(id) => write!(f, "{} {id}", self.label()),
            Note::Statement { unit, statement } => write!(f, "{unit}: {statement}"),
        }
    }
}
