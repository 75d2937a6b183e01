//! Project settings, stored as `dbpatch.yaml` at the project root.
//!
//! # File layout
//!
//! ```text
//! table: patches
//! default_connection: main
//! patch_dir: database/patches
//! extension: sql
//! paths: []
//! connections:
//!   main:
//!     database: database/database.sqlite
//! ```
//!
//! Every field is optional; a missing file yields [`Settings::default`].
//!
//! # API pattern
//!
//! Functions take the project root explicitly (`load_at(root)`,
//! `save_at(root, …)`), so tests run against a `TempDir`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, PatchError};
use crate::ledger::{validate_table_name, DEFAULT_TABLE};
use crate::scanner::{Scanner, DEFAULT_EXTENSION};

/// Settings file name at the project root.
pub const SETTINGS_FILE: &str = "dbpatch.yaml";

/// Database path that selects an in-memory SQLite connection.
pub const MEMORY_DATABASE: &str = ":memory:";

/// Connection used when none is configured or requested.
pub const DEFAULT_CONNECTION: &str = "main";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One named SQLite database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// File path, relative to the project root unless absolute, or `:memory:`.
    pub database: PathBuf,
}

/// Root of `dbpatch.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Ledger table name.
    pub table: String,
    pub default_connection: String,
    /// Default patch directory, relative to the project root.
    pub patch_dir: PathBuf,
    /// Unit file extension, without the dot.
    pub extension: String,
    /// Extra scan locations registered in addition to `patch_dir`.
    pub paths: Vec<PathBuf>,
    pub connections: BTreeMap<String, ConnectionConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut connections = BTreeMap::new();
        connections.insert(
            DEFAULT_CONNECTION.to_string(),
            ConnectionConfig {
                database: PathBuf::from("database").join("database.sqlite"),
            },
        );
        Self {
            table: DEFAULT_TABLE.to_string(),
            default_connection: DEFAULT_CONNECTION.to_string(),
            patch_dir: PathBuf::from("database").join("patches"),
            extension: DEFAULT_EXTENSION.to_string(),
            paths: Vec::new(),
            connections,
        }
    }
}

impl Settings {
    /// Reject settings the orchestrator cannot run with.
    pub fn validate(&self) -> Result<(), PatchError> {
        validate_table_name(&self.table)?;
        if !self.connections.contains_key(&self.default_connection) {
            return Err(PatchError::UnknownConnection {
                name: self.default_connection.clone(),
            });
        }
        Ok(())
    }

    /// Scanner configured for this project's unit extension.
    pub fn scanner(&self) -> Scanner {
        Scanner::new(self.extension.clone())
    }

    /// Absolute path of the default patch directory.
    pub fn patch_dir_at(&self, root: &Path) -> PathBuf {
        root.join(&self.patch_dir)
    }

    /// Locations to scan for one invocation.
    ///
    /// Explicit `overrides` replace the configured locations; each is joined
    /// onto `root` unless `realpath` says they are already resolved. Without
    /// overrides, the registered `paths` followed by `patch_dir` are used.
    pub fn patch_paths(&self, root: &Path, overrides: &[PathBuf], realpath: bool) -> Vec<PathBuf> {
        if !overrides.is_empty() {
            return overrides
                .iter()
                .map(|p| if realpath { p.clone() } else { root.join(p) })
                .collect();
        }

        let mut paths: Vec<PathBuf> = self.paths.iter().map(|p| root.join(p)).collect();
        let default_dir = self.patch_dir_at(root);
        if !paths.contains(&default_dir) {
            paths.push(default_dir);
        }
        paths
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<root>/dbpatch.yaml` — pure, no I/O.
pub fn settings_path_at(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

/// Load settings from `<root>/dbpatch.yaml`, or defaults if the file is absent.
///
/// Returns `PatchError::ConfigParse` (with the path) if the YAML is malformed.
pub fn load_at(root: &Path) -> Result<Settings, PatchError> {
    let path = settings_path_at(root);
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file; using defaults");
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let settings: Settings = serde_yaml::from_str(&contents)
        .map_err(|e| PatchError::ConfigParse { path, source: e })?;
    settings.validate()?;
    Ok(settings)
}

/// Atomically write settings to `<root>/dbpatch.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `rename`.
pub fn save_at(root: &Path, settings: &Settings) -> Result<(), PatchError> {
    std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    let path = settings_path_at(root);
    let tmp_path = path.with_extension("yaml.tmp");

    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp_path, yaml).map_err(|e| io_err(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Write default settings unless a settings file already exists.
/// Returns `true` when a file was written.
pub fn init_at(root: &Path) -> Result<bool, PatchError> {
    if settings_path_at(root).exists() {
        return Ok(false);
    }
    save_at(root, &Settings::default())?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
