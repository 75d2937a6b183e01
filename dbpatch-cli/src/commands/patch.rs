//! `dbpatch patch` — apply every pending patch.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use dbpatch_engine::{ApplyOptions, Patcher};

use super::{install::ensure_ledger, print_notes, Project, TargetArgs};

/// Arguments for `dbpatch patch`.
#[derive(Args, Debug)]
pub struct PatchArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the statements that would run without running them.
    #[arg(long)]
    pub pretend: bool,

    /// Give every patch its own batch so they can be rolled back one by one.
    #[arg(long)]
    pub step: bool,
}

impl PatchArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let project = Project::open(root, &self.target)?;
        let mut patcher = Patcher::new(&project.connections, &project.registry, &project.settings);
        let database = self.target.database.as_deref();

        ensure_ledger(&patcher, database)?;

        let options = ApplyOptions {
            pretend: self.pretend,
            step: self.step,
            connection: self.target.database.clone(),
        };
        let result = patcher.apply(&project.paths, &options);
        print_notes(patcher.notes());
        result.context("patch run failed")?;
        Ok(())
    }
}
