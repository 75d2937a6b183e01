//! `dbpatch make <name>` — scaffold a new patch file.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dbpatch_core::{config, Scanner};
use dbpatch_engine::{make_patch, MakeOptions};

/// Arguments for `dbpatch make`.
#[derive(Args, Debug)]
pub struct MakeArgs {
    /// Patch name, e.g. `create_users_table` or `AddEmailToUsers`.
    pub name: String,

    /// Table the patch creates.
    #[arg(long, value_name = "TABLE")]
    pub create: Option<String>,

    /// Table the patch changes.
    #[arg(long, value_name = "TABLE", conflicts_with = "create")]
    pub table: Option<String>,

    /// Directory to write into instead of `patch_dir`.
    #[arg(long)]
    pub path: Option<std::path::PathBuf>,

    /// Treat `--path` as already resolved.
    #[arg(long, requires = "path")]
    pub realpath: bool,
}

impl MakeArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let settings = config::load_at(root).context("failed to load settings")?;
        let dir = match &self.path {
            Some(path) if self.realpath => path.clone(),
            Some(path) => root.join(path),
            None => settings.patch_dir_at(root),
        };

        let options = MakeOptions {
            table: self.table,
            create: self.create,
        };
        let now = chrono::Local::now().naive_local();
        let path = make_patch(&dir, &self.name, &options, now, &settings.extension)
            .with_context(|| format!("failed to create patch '{}'", self.name))?;

        let id = Scanner::patch_id(&path).map(|id| id.0).unwrap_or_default();
        println!("{} {id}", "Created Patch:".green());
        Ok(())
    }
}
