//! SQL file patches.
//!
//! A `.sql` patch is split into sections by marker comments:
//!
//! ```text
//! -- up
//! CREATE TABLE users (
//!     id INTEGER PRIMARY KEY
//! );
//! -- down
//! DROP TABLE users;
//! ```
//!
//! Optional directives anywhere in the file:
//! - `-- no-transaction` runs the actions outside a transaction;
//! - `-- connection: <name>` targets a named connection.
//!
//! A statement ends at a line whose trimmed text ends with `;`. Other `--`
//! comment lines are dropped. Either section may be missing.

use std::path::Path;

use dbpatch_core::{Executor, PatchUnit, ScannedPatches, UnitRegistry, UnitResult};

use crate::error::{io_err, EngineError};

const UP_MARKER: &str = "up";
const DOWN_MARKER: &str = "down";
const NO_TRANSACTION: &str = "no-transaction";
const CONNECTION_PREFIX: &str = "connection:";

/// A patch backed by a `.sql` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlPatch {
    up: Vec<String>,
    down: Vec<String>,
    transactional: bool,
    connection: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

impl SqlPatch {
    /// Parse patch source. The error is a human-readable reason.
    pub fn parse(source: &str) -> Result<Self, String> {
        let mut patch = SqlPatch {
            transactional: true,
            ..SqlPatch::default()
        };
        let mut section = Section::Preamble;
        let mut seen_up = false;
        let mut seen_down = false;
        let mut buffer = String::new();

        for (lineno, line) in source.lines().enumerate() {
            let trimmed = line.trim();

            if let Some(comment) = trimmed.strip_prefix("--") {
                let directive = comment.trim();
                match directive.to_ascii_lowercase().as_str() {
                    UP_MARKER | DOWN_MARKER => {
                        patch.flush(section, &mut buffer);
                        let is_up = directive.eq_ignore_ascii_case(UP_MARKER);
                        let seen = if is_up { &mut seen_up } else { &mut seen_down };
                        if *seen {
                            return Err(format!(
                                "line {}: duplicate `-- {}` section",
                                lineno + 1,
                                directive.to_ascii_lowercase()
                            ));
                        }
                        *seen = true;
                        section = if is_up { Section::Up } else { Section::Down };
                    }
                    NO_TRANSACTION => patch.transactional = false,
                    lower if lower.starts_with(CONNECTION_PREFIX) => {
                        let name = directive[CONNECTION_PREFIX.len()..].trim();
                        if name.is_empty() {
                            return Err(format!("line {}: empty connection name", lineno + 1));
                        }
                        patch.connection = Some(name.to_string());
                    }
                    _ => {}
                }
                continue;
            }

            if trimmed.is_empty() && buffer.is_empty() {
                continue;
            }
            if section == Section::Preamble {
                return Err(format!(
                    "line {}: statement outside of an `-- up` or `-- down` section",
                    lineno + 1
                ));
            }

            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(line);
            if trimmed.ends_with(';') {
                patch.flush(section, &mut buffer);
            }
        }
        patch.flush(section, &mut buffer);

        Ok(patch)
    }

    /// Read and parse a patch file.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let source = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Self::parse(&source).map_err(|reason| EngineError::InvalidPatchFile {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn up_statements(&self) -> &[String] {
        &self.up
    }

    pub fn down_statements(&self) -> &[String] {
        &self.down
    }

    fn flush(&mut self, section: Section, buffer: &mut String) {
        let statement = buffer.trim();
        if !statement.is_empty() {
            match section {
                Section::Up => self.up.push(statement.to_string()),
                Section::Down => self.down.push(statement.to_string()),
                Section::Preamble => {}
            }
        }
        buffer.clear();
    }
}

impl PatchUnit for SqlPatch {
    fn up(&self, db: &mut dyn Executor) -> UnitResult {
        for statement in &self.up {
            db.execute(statement)?;
        }
        Ok(())
    }

    fn down(&self, db: &mut dyn Executor) -> UnitResult {
        for statement in &self.down {
            db.execute(statement)?;
        }
        Ok(())
    }

    fn within_transaction(&self) -> bool {
        self.transactional
    }

    fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }
}

/// Parse every scanned file and register it under its exact identifier.
///
/// Returns the number of units registered.
pub fn register_sql_patches(
    scanned: &ScannedPatches,
    registry: &mut UnitRegistry,
) -> Result<usize, EngineError> {
    for (id, path) in scanned {
        let patch = SqlPatch::from_file(path)?;
        tracing::debug!(
            patch = %id,
            up = patch.up.len(),
            down = patch.down.len(),
            "loaded sql patch"
        );
        registry.register_id(
            id.clone(),
            Box::new(move || Box::new(patch.clone()) as Box<dyn PatchUnit>),
        );
    }
    Ok(scanned.len())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
