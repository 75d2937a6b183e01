//! `dbpatch rollback` — undo the last batch, or the last `--step` patches.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use dbpatch_engine::{Patcher, RollbackOptions};

use super::{print_notes, Project, TargetArgs};

/// Arguments for `dbpatch rollback`.
#[derive(Args, Debug)]
pub struct RollbackArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Print the statements that would run without running them.
    #[arg(long)]
    pub pretend: bool,

    /// Number of most recent patches to roll back (default: the last batch).
    #[arg(long, default_value_t = 0)]
    pub step: u32,
}

impl RollbackArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let project = Project::open(root, &self.target)?;
        let mut patcher = Patcher::new(&project.connections, &project.registry, &project.settings);

        let options = RollbackOptions {
            pretend: self.pretend,
            step: self.step,
            connection: self.target.database.clone(),
        };
        let result = patcher.rollback(&project.paths, &options);
        print_notes(patcher.notes());
        result.context("rollback failed")?;
        Ok(())
    }
}
