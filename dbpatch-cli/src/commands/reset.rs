//! `dbpatch reset` — roll back every applied patch.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dbpatch_engine::{Patcher, ResetOptions};

use super::{print_notes, Project, TargetArgs, LEDGER_MISSING};

/// Arguments for `dbpatch reset`.
#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the statements that would run without running them.
    #[arg(long)]
    pub pretend: bool,
}

impl ResetArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let project = Project::open(root, &self.target)?;
        let mut patcher = Patcher::new(&project.connections, &project.registry, &project.settings);
        let database = self.target.database.as_deref();

        if !patcher.repository_exists(database)? {
            println!("{}", LEDGER_MISSING.yellow());
            return Ok(());
        }

        let options = ResetOptions {
            pretend: self.pretend,
            connection: self.target.database.clone(),
        };
        let result = patcher.reset(&project.paths, &options);
        print_notes(patcher.notes());
        result.context("reset failed")?;
        Ok(())
    }
}
