//! Ledger repository: which patches have been applied, and in which batch.
//!
//! # Storage layout
//!
//! ```text
//! CREATE TABLE "<table>" (
//!     id    INTEGER PRIMARY KEY AUTOINCREMENT,
//!     patch TEXT    NOT NULL,
//!     batch INTEGER NOT NULL
//! )
//! ```
//!
//! Uniqueness of `patch` is enforced here, not by the store: [`Ledger::record`]
//! refuses a second entry for the same identifier.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::PatchError;
use crate::types::{Batch, LedgerEntry, PatchId};

/// Default ledger table name.
pub const DEFAULT_TABLE: &str = "patches";

/// Ledger bound to one connection and one table.
#[derive(Debug)]
pub struct Ledger<'c> {
    conn: &'c Connection,
    table: String,
}

impl<'c> Ledger<'c> {
    /// Bind the ledger to `conn`. `table` must be a plain SQL identifier.
    pub fn new(conn: &'c Connection, table: &str) -> Result<Self, PatchError> {
        validate_table_name(table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the backing table has been provisioned.
    pub fn exists(&self) -> Result<bool, PatchError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Provision the backing table. Callers check [`Ledger::exists`] first.
    pub fn create(&self) -> Result<(), PatchError> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE \"{}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                patch TEXT NOT NULL,
                batch INTEGER NOT NULL
            );",
            self.table
        ))?;
        tracing::info!(table = %self.table, "created patch ledger");
        Ok(())
    }

    /// Fails with [`PatchError::StoreMissing`] unless the table exists.
    pub fn ensure_exists(&self) -> Result<(), PatchError> {
        if self.exists()? {
            Ok(())
        } else {
            Err(PatchError::StoreMissing {
                table: self.table.clone(),
            })
        }
    }

    /// Applied identifiers ordered by `(batch asc, patch asc)`.
    pub fn applied(&self) -> Result<Vec<PatchId>, PatchError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT patch FROM \"{}\" ORDER BY batch ASC, patch ASC",
            self.table
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(PatchId::from(row?));
        }
        Ok(ids)
    }

    /// Applied identifiers with their batch numbers.
    pub fn applied_with_batch(&self) -> Result<BTreeMap<PatchId, Batch>, PatchError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT patch, batch FROM \"{}\" ORDER BY batch ASC, patch ASC",
            self.table
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Batch>(1)?))
        })?;
        let mut batches = BTreeMap::new();
        for row in rows {
            let (id, batch) = row?;
            batches.insert(PatchId::from(id), batch);
        }
        Ok(batches)
    }

    /// Highest batch number, or `0` when the ledger is empty.
    pub fn last_batch_number(&self) -> Result<Batch, PatchError> {
        let max: Option<Batch> = self.conn.query_row(
            &format!("SELECT MAX(batch) FROM \"{}\"", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    pub fn next_batch_number(&self) -> Result<Batch, PatchError> {
        following_batch(self.last_batch_number()?)
    }

    /// Every entry of the highest batch, ordered `patch desc`.
    pub fn most_recent_batch(&self) -> Result<Vec<LedgerEntry>, PatchError> {
        let last = self.last_batch_number()?;
        self.entries(
            &format!(
                "SELECT patch, batch FROM \"{}\" WHERE batch = ?1 ORDER BY patch DESC",
                self.table
            ),
            params![last],
        )
    }

    /// The `n` most recently applied entries across batch boundaries,
    /// ordered `(batch desc, patch desc)`.
    pub fn last_entries(&self, n: u32) -> Result<Vec<LedgerEntry>, PatchError> {
        self.entries(
            &format!(
                "SELECT patch, batch FROM \"{}\" WHERE batch >= 1 \
                 ORDER BY batch DESC, patch DESC LIMIT ?1",
                self.table
            ),
            params![n],
        )
    }

    /// Record one applied patch.
    pub fn record(&self, id: &PatchId, batch: Batch) -> Result<(), PatchError> {
        if self.contains(id)? {
            return Err(PatchError::DuplicateEntry { id: id.clone() });
        }
        self.conn.execute(
            &format!("INSERT INTO \"{}\" (patch, batch) VALUES (?1, ?2)", self.table),
            params![id.as_str(), batch],
        )?;
        tracing::debug!(patch = %id, batch, "recorded ledger entry");
        Ok(())
    }

    /// Remove the entry for `id`. Removing an absent entry is a no-op.
    pub fn remove(&self, id: &PatchId) -> Result<(), PatchError> {
        let removed = self.conn.execute(
            &format!("DELETE FROM \"{}\" WHERE patch = ?1", self.table),
            params![id.as_str()],
        )?;
        tracing::debug!(patch = %id, removed, "removed ledger entry");
        Ok(())
    }

    pub fn contains(&self, id: &PatchId) -> Result<bool, PatchError> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM \"{}\" WHERE patch = ?1 LIMIT 1", self.table),
                params![id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn entries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<LedgerEntry>, PatchError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(LedgerEntry::new(row.get::<_, String>(0)?, row.get::<_, Batch>(1)?))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

/// The batch after `batch`, or [`PatchError::BatchOverflow`].
pub fn following_batch(batch: Batch) -> Result<Batch, PatchError> {
    batch
        .checked_add(1)
        .ok_or(PatchError::BatchOverflow { batch })
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn validate_table_name(table: &str) -> Result<(), PatchError> {
    let mut chars = table.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(PatchError::InvalidTableName(table.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
