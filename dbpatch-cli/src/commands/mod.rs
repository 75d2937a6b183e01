//! Subcommands and the project plumbing they share.

pub mod install;
pub mod make;
pub mod patch;
pub mod refresh;
pub mod reset;
pub mod rollback;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dbpatch_core::{config, Connections, Settings, UnitRegistry};
use dbpatch_engine::{register_sql_patches, Note};

/// Scan-location and connection flags shared by the run commands.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Connection to run against (defaults to `default_connection`).
    #[arg(long)]
    pub database: Option<String>,

    /// Patch file or directory to scan instead of the configured ones.
    /// Repeatable.
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Treat `--path` values as already resolved instead of joining them
    /// onto the project root.
    #[arg(long)]
    pub realpath: bool,
}

/// Settings, open connections and loaded units for one invocation.
pub struct Project {
    pub settings: Settings,
    pub connections: Connections,
    pub registry: UnitRegistry,
    pub paths: Vec<PathBuf>,
}

impl Project {
    /// Load `dbpatch.yaml`, open every connection and register the units
    /// found under the invocation's scan paths.
    pub fn open(root: &Path, target: &TargetArgs) -> Result<Self> {
        let settings = config::load_at(root)
            .with_context(|| format!("failed to load settings under '{}'", root.display()))?;
        let connections =
            Connections::open_at(root, &settings).context("failed to open database connections")?;
        let paths = settings.patch_paths(root, &target.paths, target.realpath);

        let scanned = settings
            .scanner()
            .scan(&paths)
            .context("failed to scan patch paths")?;
        let mut registry = UnitRegistry::new();
        let loaded = register_sql_patches(&scanned, &mut registry)?;
        tracing::debug!(loaded, paths = ?paths, "loaded patch units");

        Ok(Self {
            settings,
            connections,
            registry,
            paths,
        })
    }
}

/// Print orchestrator notes, one per line.
pub fn print_notes(notes: &[Note]) {
    for note in notes {
        match note {
            Note::NothingToPatch | Note::NothingToRollback => {
                println!("{}", note.label().cyan())
            }
            Note::Patching(id) | Note::RollingBack(id) => {
                println!("{} {id}", note.label().yellow())
            }
            Note::Patched(id) | Note::RolledBack(id) => {
                println!("{} {id}", note.label().green())
            }
            Note::Statement { unit, statement } => {
                println!("{} {statement}", format!("{unit}:").bright_black())
            }
            Note::PatchNotFound(id) => println!("{} {id}", note.label().red()),
        }
    }
}

/// The message printed when a command needs the ledger and it is absent.
pub const LEDGER_MISSING: &str = "Patch table not found.";
