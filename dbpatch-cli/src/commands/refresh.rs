//! `dbpatch refresh` — roll back (or reset), then apply everything again.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use dbpatch_engine::{Patcher, RefreshOptions};

use super::{install::ensure_ledger, print_notes, Project, TargetArgs};

/// Arguments for `dbpatch refresh`.
#[derive(Args, Debug)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Roll back this many patches instead of resetting everything.
    #[arg(long, default_value_t = 0)]
    pub step: u32,
}

impl RefreshArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let project = Project::open(root, &self.target)?;
        let mut patcher = Patcher::new(&project.connections, &project.registry, &project.settings);

        ensure_ledger(&patcher, self.target.database.as_deref())?;

        let options = RefreshOptions {
            step: self.step,
            connection: self.target.database.clone(),
        };
        let result = patcher.refresh(&project.paths, &options);
        print_notes(patcher.notes());
        result.context("refresh failed")?;
        Ok(())
    }
}
