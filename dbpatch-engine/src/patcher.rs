//! The orchestrator: apply, rollback, reset, refresh and status.
//!
//! ## Apply
//!
//! 1. Scan the given paths.
//! 2. Pending = scanned identifiers not in the ledger, ascending.
//! 3. Resolve each pending unit and run `up` (or capture it in pretend mode).
//! 4. Record `(id, batch)` after each real success. With `step`, every unit
//!    gets its own batch.
//!
//! ## Rollback / reset
//!
//! Targets come from the ledger (most recent batch, the last `step` entries,
//! or everything for reset) already in undo order. A target whose unit is no
//! longer discoverable is skipped with a [`Note::PatchNotFound`]; the rest
//! still roll back.
//!
//! Runs are sequential and not atomic across units. A failing unit aborts the
//! run; units committed before it keep their ledger entries.

use std::collections::HashSet;
use std::path::PathBuf;

use dbpatch_core::{
    ledger::following_batch, unit::type_name, Batch, Connections, Direction, Executor, Ledger,
    LiveExecutor, PatchId, PatchUnit, PretendExecutor, Scanner, Settings, UnitRegistry,
    UnitResult,
};

use crate::error::EngineError;
use crate::note::Note;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Options for [`Patcher::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Capture statements instead of running them; the ledger is untouched.
    pub pretend: bool,
    /// Give every applied unit its own batch.
    pub step: bool,
    /// Connection to run against; defaults to the configured one.
    pub connection: Option<String>,
}

/// Options for [`Patcher::rollback`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackOptions {
    pub pretend: bool,
    /// Roll back this many most recent entries instead of the last batch.
    /// `0` means "the last batch".
    pub step: u32,
    pub connection: Option<String>,
}

/// Options for [`Patcher::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub pretend: bool,
    pub connection: Option<String>,
}

/// Options for [`Patcher::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Roll back this many entries before re-applying; `0` resets everything.
    pub step: u32,
    pub connection: Option<String>,
}

/// Outcome of [`Patcher::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub rolled_back: Vec<PatchId>,
    pub applied: Vec<PatchId>,
}

/// One row of [`Patcher::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStatus {
    pub id: PatchId,
    pub path: PathBuf,
    /// Batch the patch was applied in; `None` while pending.
    pub batch: Option<Batch>,
}

impl PatchStatus {
    pub fn ran(&self) -> bool {
        self.batch.is_some()
    }
}

// ---------------------------------------------------------------------------
// Patcher
// ---------------------------------------------------------------------------

/// Drives patch units against a set of named connections.
///
/// Notes from the most recent call are kept in [`Patcher::notes`], including
/// the ones emitted before a failure.
#[derive(Debug)]
pub struct Patcher<'a> {
    connections: &'a Connections,
    registry: &'a UnitRegistry,
    scanner: Scanner,
    table: String,
    default_connection: String,
    notes: Vec<Note>,
}

impl<'a> Patcher<'a> {
    pub fn new(
        connections: &'a Connections,
        registry: &'a UnitRegistry,
        settings: &Settings,
    ) -> Self {
        Self {
            connections,
            registry,
            scanner: settings.scanner(),
            table: settings.table.clone(),
            default_connection: settings.default_connection.clone(),
            notes: Vec::new(),
        }
    }

    /// Notes emitted by the most recent call.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn take_notes(&mut self) -> Vec<Note> {
        std::mem::take(&mut self.notes)
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// The ledger on `connection` (or the default connection).
    pub fn ledger(&self, connection: Option<&str>) -> Result<Ledger<'a>, EngineError> {
        let connections: &'a Connections = self.connections;
        let conn = connections.get(connection.unwrap_or(&self.default_connection))?;
        Ok(Ledger::new(conn, &self.table)?)
    }

    /// Whether the ledger table exists on `connection`.
    pub fn repository_exists(&self, connection: Option<&str>) -> Result<bool, EngineError> {
        Ok(self.ledger(connection)?.exists()?)
    }

    /// Provision the ledger table if it is absent. Returns `true` if created.
    pub fn install(&self, connection: Option<&str>) -> Result<bool, EngineError> {
        let ledger = self.ledger(connection)?;
        if ledger.exists()? {
            return Ok(false);
        }
        ledger.create()?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    /// Apply every pending patch under `paths`, ascending by identifier.
    ///
    /// Returns the identifiers processed (previewed ones in pretend mode).
    pub fn apply(
        &mut self,
        paths: &[PathBuf],
        options: &ApplyOptions,
    ) -> Result<Vec<PatchId>, EngineError> {
        self.notes.clear();
        let connection = self.connection_name(options.connection.as_deref());
        let ledger = self.ledger(Some(&connection))?;
        ledger.ensure_exists()?;

        let scanned = self.scanner.scan(paths)?;
        let applied: HashSet<PatchId> = ledger.applied()?.into_iter().collect();
        let pending: Vec<PatchId> = scanned
            .into_keys()
            .filter(|id| !applied.contains(id))
            .collect();

        if pending.is_empty() {
            self.note(Note::NothingToPatch);
            return Ok(pending);
        }

        let mut batch = ledger.next_batch_number()?;
        for (i, id) in pending.iter().enumerate() {
            if i > 0 && options.step && !options.pretend {
                batch = following_batch(batch)?;
            }

            self.run_up(&ledger, id, batch, options.pretend, &connection)?;
        }

        Ok(pending)
    }

    fn run_up(
        &mut self,
        ledger: &Ledger<'_>,
        id: &PatchId,
        batch: Batch,
        pretend: bool,
        connection: &str,
    ) -> Result<(), EngineError> {
        let unit = self.registry.resolve(id)?;

        if pretend {
            return self.pretend_to_run(id, unit.as_ref(), Direction::Up, connection);
        }

        self.note(Note::Patching(id.clone()));
        self.run_unit(id, unit.as_ref(), Direction::Up, connection)?;
        ledger.record(id, batch)?;
        tracing::info!(patch = %id, batch, "patched");
        self.note(Note::Patched(id.clone()));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rollback / reset
    // -----------------------------------------------------------------------

    /// Roll back the last batch, or the last `step` entries.
    pub fn rollback(
        &mut self,
        paths: &[PathBuf],
        options: &RollbackOptions,
    ) -> Result<Vec<PatchId>, EngineError> {
        self.notes.clear();
        let connection = self.connection_name(options.connection.as_deref());
        let ledger = self.ledger(Some(&connection))?;
        ledger.ensure_exists()?;

        let targets = if options.step > 0 {
            ledger.last_entries(options.step)?
        } else {
            ledger.most_recent_batch()?
        };

        if targets.is_empty() {
            self.note(Note::NothingToRollback);
            return Ok(Vec::new());
        }

        let targets: Vec<PatchId> = targets.into_iter().map(|entry| entry.id).collect();
        self.rollback_targets(&ledger, targets, paths, options.pretend, &connection)
    }

    /// Roll back every applied patch, most recent first.
    pub fn reset(
        &mut self,
        paths: &[PathBuf],
        options: &ResetOptions,
    ) -> Result<Vec<PatchId>, EngineError> {
        self.notes.clear();
        let connection = self.connection_name(options.connection.as_deref());
        let ledger = self.ledger(Some(&connection))?;
        ledger.ensure_exists()?;

        let mut targets = ledger.applied()?;
        if targets.is_empty() {
            self.note(Note::NothingToRollback);
            return Ok(Vec::new());
        }
        targets.reverse();

        self.rollback_targets(&ledger, targets, paths, options.pretend, &connection)
    }

    fn rollback_targets(
        &mut self,
        ledger: &Ledger<'_>,
        targets: Vec<PatchId>,
        paths: &[PathBuf],
        pretend: bool,
        connection: &str,
    ) -> Result<Vec<PatchId>, EngineError> {
        let scanned = self.scanner.scan(paths)?;
        let mut rolled_back = Vec::new();

        for id in targets {
            if !scanned.contains_key(&id) {
                tracing::warn!(patch = %id, "patch not found; skipping rollback");
                self.note(Note::PatchNotFound(id));
                continue;
            }

            self.run_down(ledger, &id, pretend, connection)?;
            rolled_back.push(id);
        }

        Ok(rolled_back)
    }

    fn run_down(
        &mut self,
        ledger: &Ledger<'_>,
        id: &PatchId,
        pretend: bool,
        connection: &str,
    ) -> Result<(), EngineError> {
        let unit = self.registry.resolve(id)?;

        self.note(Note::RollingBack(id.clone()));

        if pretend {
            return self.pretend_to_run(id, unit.as_ref(), Direction::Down, connection);
        }

        self.run_unit(id, unit.as_ref(), Direction::Down, connection)?;
        ledger.remove(id)?;
        tracing::info!(patch = %id, "rolled back");
        self.note(Note::RolledBack(id.clone()));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Refresh / status
    // -----------------------------------------------------------------------

    /// Roll back (`step > 0`) or reset, then apply everything pending.
    pub fn refresh(
        &mut self,
        paths: &[PathBuf],
        options: &RefreshOptions,
    ) -> Result<RefreshReport, EngineError> {
        let rolled_back = if options.step > 0 {
            self.rollback(
                paths,
                &RollbackOptions {
                    pretend: false,
                    step: options.step,
                    connection: options.connection.clone(),
                },
            )?
        } else {
            self.reset(
                paths,
                &ResetOptions {
                    pretend: false,
                    connection: options.connection.clone(),
                },
            )?
        };
        let mut notes = self.take_notes();

        let applied = self.apply(
            paths,
            &ApplyOptions {
                connection: options.connection.clone(),
                ..ApplyOptions::default()
            },
        );
        notes.append(&mut self.notes);
        self.notes = notes;

        Ok(RefreshReport {
            rolled_back,
            applied: applied?,
        })
    }

    /// Ran/pending state of every discovered patch, ascending.
    pub fn status(
        &self,
        paths: &[PathBuf],
        connection: Option<&str>,
    ) -> Result<Vec<PatchStatus>, EngineError> {
        let ledger = self.ledger(connection)?;
        ledger.ensure_exists()?;

        let batches = ledger.applied_with_batch()?;
        let scanned = self.scanner.scan(paths)?;
        Ok(scanned
            .into_iter()
            .map(|(id, path)| PatchStatus {
                batch: batches.get(&id).copied(),
                id,
                path,
            })
            .collect())
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn run_unit(
        &self,
        id: &PatchId,
        unit: &dyn PatchUnit,
        direction: Direction,
        connection: &str,
    ) -> Result<(), EngineError> {
        let conn = self
            .connections
            .get(unit.connection().unwrap_or(connection))?;

        let result = if unit.within_transaction() {
            match conn.unchecked_transaction() {
                Ok(tx) => {
                    let mut db = LiveExecutor::new(&tx);
                    match run_action(unit, direction, &mut db) {
                        // Dropping `tx` on the error path rolls it back.
                        Ok(()) => tx.commit().map_err(Into::into),
                        Err(err) => Err(err),
                    }
                }
                Err(err) => Err(err.into()),
            }
        } else {
            run_action(unit, direction, &mut LiveExecutor::new(conn))
        };

        result.map_err(|source| {
            tracing::error!(patch = %id, %direction, error = %source, "patch failed");
            EngineError::Execution {
                id: id.clone(),
                direction,
                source,
            }
        })
    }

    fn pretend_to_run(
        &mut self,
        id: &PatchId,
        unit: &dyn PatchUnit,
        direction: Direction,
        connection: &str,
    ) -> Result<(), EngineError> {
        self.connections
            .get(unit.connection().unwrap_or(connection))?;

        let mut db = PretendExecutor::new();
        run_action(unit, direction, &mut db).map_err(|source| EngineError::Execution {
            id: id.clone(),
            direction,
            source,
        })?;

        let name = type_name(id).unwrap_or_else(|| id.to_string());
        for statement in db.into_statements() {
            self.note(Note::Statement {
                unit: name.clone(),
                statement,
            });
        }
        Ok(())
    }

    fn connection_name(&self, requested: Option<&str>) -> String {
        requested.unwrap_or(&self.default_connection).to_string()
    }

    fn note(&mut self, note: Note) {
        tracing::debug!(%note, "note");
        self.notes.push(note);
    }
}

fn run_action(unit: &dyn PatchUnit, direction: Direction, db: &mut dyn Executor) -> UnitResult {
    match direction {
        Direction::Up => unit.up(db),
        Direction::Down => unit.down(db),
    }
}

