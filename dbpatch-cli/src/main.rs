//! dbpatch — ordered, reversible schema patches for SQLite.
//!
//! # Usage
//!
//! ```text
//! dbpatch install [--database <name>]
//! dbpatch patch [--database <name>] [--path <p>]... [--realpath] [--pretend] [--step]
//! dbpatch rollback [--step <n>] [--pretend] [...]
//! dbpatch reset [--pretend] [...]
//! dbpatch refresh [--step <n>] [...]
//! dbpatch status [--json] [...]
//! dbpatch make <name> [--create <table> | --table <table>] [--path <dir>]
//! ```
//!
//! Every command works on the project rooted at `--root` (default: the
//! current directory), configured by `dbpatch.yaml`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    install::InstallArgs, make::MakeArgs, patch::PatchArgs, refresh::RefreshArgs,
    reset::ResetArgs, rollback::RollbackArgs, status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "dbpatch",
    version,
    about = "Apply, roll back and inspect ordered database patches",
    long_about = None,
)]
struct Cli {
    /// Project root containing `dbpatch.yaml`.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log debug detail to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the settings file, patch directory and patch table.
    Install(InstallArgs),

    /// Apply every pending patch.
    Patch(PatchArgs),

    /// Roll back the last batch of patches.
    Rollback(RollbackArgs),

    /// Roll back every applied patch.
    Reset(ResetArgs),

    /// Roll back (or reset) and apply all patches again.
    Refresh(RefreshArgs),

    /// Show which patches have run.
    Status(StatusArgs),

    /// Create a new patch file.
    Make(MakeArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = cli.root.as_path();
    match cli.command {
        Commands::Install(args) => args.run(root),
        Commands::Patch(args) => args.run(root),
        Commands::Rollback(args) => args.run(root),
        Commands::Reset(args) => args.run(root),
        Commands::Refresh(args) => args.run(root),
        Commands::Status(args) => args.run(root),
        Commands::Make(args) => args.run(root),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
