//! Domain types shared by the scanner, ledger and orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A patch identifier: the file stem `<ordering-token>_<description>`.
///
/// Ordering is plain lexicographic, which matches authorship order as long as
/// the ordering token is monotonic (timestamps, zero-padded counters).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchId(pub String);

impl PatchId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PatchId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PatchId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Batch number grouping ledger entries applied together. Always `>= 1`
/// once recorded.
pub type Batch = u32;

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: PatchId,
    pub batch: Batch,
}

impl LedgerEntry {
    pub fn new(id: impl Into<PatchId>, batch: Batch) -> Self {
        Self {
            id: id.into(),
            batch,
        }
    }
}

/// Which action of a unit is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
