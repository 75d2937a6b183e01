//! `dbpatch status` — which patches have run and which are pending.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use dbpatch_engine::{PatchStatus, Patcher};

use super::{Project, TargetArgs, LEDGER_MISSING};

/// Arguments for `dbpatch status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let project = Project::open(root, &self.target)?;
        let patcher = Patcher::new(&project.connections, &project.registry, &project.settings);
        let database = self.target.database.as_deref();

        if !patcher.repository_exists(database)? {
            if self.json {
                anyhow::bail!(LEDGER_MISSING);
            }
            println!("{}", LEDGER_MISSING.yellow());
            return Ok(());
        }

        let rows = patcher
            .status(&project.paths, database)
            .context("failed to read patch status")?;
        if self.json {
            return print_json(&rows);
        }
        print_table(rows);
        Ok(())
    }
}

#[derive(Serialize)]
struct StatusReportJson<'a> {
    ran: usize,
    pending: usize,
    patches: Vec<PatchStatusJson<'a>>,
}

#[derive(Serialize)]
struct PatchStatusJson<'a> {
    patch: &'a str,
    ran: bool,
    batch: Option<u32>,
    path: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "Ran?")]
    ran: String,
    #[tabled(rename = "Patch")]
    patch: String,
    #[tabled(rename = "Batch")]
    batch: String,
}

fn print_json(rows: &[PatchStatus]) -> Result<()> {
    let ran = rows.iter().filter(|row| row.ran()).count();
    let payload = StatusReportJson {
        ran,
        pending: rows.len() - ran,
        patches: rows
            .iter()
            .map(|row| PatchStatusJson {
                patch: row.id.as_str(),
                ran: row.ran(),
                batch: row.batch,
                path: row.path.display().to_string(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: Vec<PatchStatus>) {
    if rows.is_empty() {
        println!("No patches found.");
        return;
    }

    let pending = rows.iter().filter(|row| !row.ran()).count();
    let table_rows: Vec<StatusTableRow> = rows
        .into_iter()
        .map(|row| StatusTableRow {
            ran: if row.ran() {
                "Yes".green().to_string()
            } else {
                "No".red().to_string()
            },
            batch: row.batch.map(|b| b.to_string()).unwrap_or_default(),
            patch: row.id.0,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending > 0 {
        println!("{pending} pending. Run 'dbpatch patch' to apply.");
    }
}
