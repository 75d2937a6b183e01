//! Named SQLite connections.
//!
//! Every orchestrator call names the connection it runs against; there is no
//! mutable "current default". Units may override it with their own name.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::Connection;

use crate::config::{ConnectionConfig, Settings, MEMORY_DATABASE};
use crate::error::{io_err, PatchError};

/// The set of open connections, keyed by name.
#[derive(Debug, Default)]
pub struct Connections {
    conns: BTreeMap<String, Connection>,
}

impl Connections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open every connection configured in `settings`. Relative database
    /// paths resolve against `root`; parent directories are created.
    pub fn open_at(root: &Path, settings: &Settings) -> Result<Self, PatchError> {
        let mut conns = Self::new();
        for (name, config) in &settings.connections {
            conns.insert(name.clone(), open_one(root, config)?);
        }
        Ok(conns)
    }

    /// In-memory connections with the given names.
    pub fn in_memory<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, PatchError> {
        let mut conns = Self::new();
        for name in names {
            conns.insert(name, Connection::open_in_memory()?);
        }
        Ok(conns)
    }

    pub fn insert(&mut self, name: impl Into<String>, conn: Connection) -> &mut Self {
        self.conns.insert(name.into(), conn);
        self
    }

    pub fn get(&self, name: &str) -> Result<&Connection, PatchError> {
        self.conns
            .get(name)
            .ok_or_else(|| PatchError::UnknownConnection {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.conns.keys().map(String::as_str)
    }
}

fn open_one(root: &Path, config: &ConnectionConfig) -> Result<Connection, PatchError> {
    if config.database.as_os_str() == MEMORY_DATABASE {
        return Ok(Connection::open_in_memory()?);
    }
    let path = if config.database.is_absolute() {
        config.database.clone()
    } else {
        root.join(&config.database)
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    tracing::debug!(path = %path.display(), "opening database");
    Ok(Connection::open(&path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn unknown_connection_is_an_error() {
        let conns = Connections::in_memory(["main"]).unwrap();
        assert!(conns.get("main").is_ok());
        let err = conns.get("analytics").unwrap_err();
        assert!(matches!(err, PatchError::UnknownConnection { .. }));
        assert!(err.to_string().contains("analytics"));
    }

    #[test]
    fn open_at_resolves_relative_paths_and_creates_parents() {
        let root = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.connections.insert(
            "main".to_string(),
            ConnectionConfig {
                database: PathBuf::from("var/db/app.sqlite"),
            },
        );
        settings.connections.insert(
            "scratch".to_string(),
            ConnectionConfig {
                database: PathBuf::from(MEMORY_DATABASE),
            },
        );

        let conns = Connections::open_at(root.path(), &settings).unwrap();
        assert_eq!(conns.names().collect::<Vec<_>>(), vec!["main", "scratch"]);
        assert!(root.path().join("var/db/app.sqlite").exists());
    }
}
