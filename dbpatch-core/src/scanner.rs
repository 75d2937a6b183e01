//! Patch discovery.
//!
//! A scan location is either a direct unit reference (a path carrying the
//! unit extension) or a directory searched, non-recursively, for files named
//! `<ordering-token>_<description>.<ext>`.
//!
//! The result is keyed by [`PatchId`] in a `BTreeMap`, so iteration is always
//! ascending by identifier. When two locations produce the same identifier the
//! one discovered last wins: locations are visited in the order given and
//! directory entries in file-name order.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::PatchError;
use crate::types::PatchId;

/// Default unit file extension.
pub const DEFAULT_EXTENSION: &str = "sql";

/// Identifier → location mapping produced by a scan.
pub type ScannedPatches = BTreeMap<PatchId, PathBuf>;

/// Stateless patch file scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanner {
    extension: String,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

impl Scanner {
    /// Scanner for unit files with the given extension (no leading dot).
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Discover every unit under `paths`.
    ///
    /// Missing locations contribute nothing. Locations that exist but cannot
    /// be read fail with [`PatchError::Scan`].
    pub fn scan(&self, paths: &[PathBuf]) -> Result<ScannedPatches, PatchError> {
        let mut found = ScannedPatches::new();
        for path in paths {
            if self.has_unit_extension(path) {
                self.scan_file(path, &mut found)?;
            } else {
                self.scan_dir(path, &mut found)?;
            }
        }
        tracing::debug!(count = found.len(), "scanned patch locations");
        Ok(found)
    }

    /// Identifier for a unit file: its stem.
    pub fn patch_id(path: &Path) -> Option<PatchId> {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .map(PatchId::from)
    }

    fn scan_file(&self, path: &Path, found: &mut ScannedPatches) -> Result<(), PatchError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_file() => {
                if let Some(id) = Self::patch_id(path) {
                    found.insert(id, path.to_path_buf());
                }
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(scan_err(path, err)),
        }
    }

    fn scan_dir(&self, dir: &Path, found: &mut ScannedPatches) -> Result<(), PatchError> {
        match std::fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(scan_err(dir, err)),
        }

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(|e| scan_err(dir, e))? {
            let path = entry.map_err(|e| scan_err(dir, e))?.path();
            if !self.matches_convention(&path) {
                continue;
            }
            // Follows symlinks; a dangling link contributes nothing.
            match std::fs::metadata(&path) {
                Ok(meta) if meta.is_file() => entries.push(path),
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(scan_err(&path, err)),
            }
        }
        entries.sort();

        for path in entries {
            match Self::patch_id(&path) {
                Some(id) => {
                    found.insert(id, path);
                }
                None => tracing::debug!(path = %path.display(), "skipping non UTF-8 file name"),
            }
        }
        Ok(())
    }

    fn has_unit_extension(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str())
    }

    /// `*_*.<ext>`
    fn matches_convention(&self, path: &Path) -> bool {
        self.has_unit_extension(path)
            && path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.contains('_'))
    }
}

fn scan_err(path: impl Into<PathBuf>, source: std::io::Error) -> PatchError {
    PatchError::Scan {
        path: path.into(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
