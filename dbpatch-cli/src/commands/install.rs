//! `dbpatch install [--database <name>]`

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dbpatch_core::{config, Connections, UnitRegistry};
use dbpatch_engine::Patcher;

/// Create the settings file, the patch directory and the ledger table.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Connection to install the ledger on.
    #[arg(long)]
    pub database: Option<String>,
}

impl InstallArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        if config::init_at(root)
            .with_context(|| format!("failed to write settings under '{}'", root.display()))?
        {
            println!("{} {}", "Created".green(), config::SETTINGS_FILE);
        }

        let settings = config::load_at(root).context("failed to load settings")?;
        let patch_dir = settings.patch_dir_at(root);
        std::fs::create_dir_all(&patch_dir)
            .with_context(|| format!("failed to create '{}'", patch_dir.display()))?;

        let connections =
            Connections::open_at(root, &settings).context("failed to open database connections")?;
        let registry = UnitRegistry::new();
        let patcher = Patcher::new(&connections, &registry, &settings);
        install_ledger(&patcher, self.database.as_deref())
    }
}

/// Provision the ledger and report what happened.
pub fn install_ledger(patcher: &Patcher<'_>, database: Option<&str>) -> Result<()> {
    if patcher
        .install(database)
        .context("failed to create the patch table")?
    {
        println!("{}", "Patch table created successfully.".green());
    } else {
        println!("Patch table already exists.");
    }
    Ok(())
}

/// Provision the ledger only when it is missing.
pub fn ensure_ledger(patcher: &Patcher<'_>, database: Option<&str>) -> Result<()> {
    if !patcher.repository_exists(database)? {
        tracing::debug!(database = ?database, "installing missing patch table");
        install_ledger(patcher, database)?;
    }
    Ok(())
}
