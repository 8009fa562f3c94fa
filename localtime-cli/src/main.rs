//! localtimed: keep the system timezone in sync with the current location.
//!
//! # Usage
//!
//! ```text
//! localtimed run [--config <path>]
//! localtimed lookup <LAT> <LON>
//! localtimed config [--config <path>]
//! localtimed install [--root <dir>] [--binary <path>] [--config <path>]
//! localtimed uninstall [--root <dir>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigArgs, install::InstallArgs, install::UninstallArgs, lookup::LookupArgs,
    run::RunArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "localtimed",
    version,
    about = "Set the system timezone from GeoClue location updates",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daemon in the foreground until SIGTERM or Ctrl-C.
    Run(RunArgs),

    /// Resolve a coordinate to its IANA timezone and exit.
    Lookup(LookupArgs),

    /// Print the effective configuration as YAML.
    Config(ConfigArgs),

    /// Write the systemd unit, polkit rule, sysusers entry and GeoClue snippet.
    Install(InstallArgs),

    /// Remove the files written by `install`.
    Uninstall(UninstallArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Lookup(args) => args.run(),
        Commands::Config(args) => args.run(),
        Commands::Install(args) => args.run(),
        Commands::Uninstall(args) => args.run(),
    }
}
