//! CLI module for footprint
//!
//! Command-line parsing for the `footprint` binary. Uses clap for argument
//! parsing and owo-colors for the run summary.

pub mod output;

use crate::types::Capability;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// footprint - identity signal investigation
///
/// Collects publicly derivable signals for an email address and/or phone
/// number from many independent sources, merges them into one record and
/// correlates them.
#[derive(Parser, Debug)]
#[command(
    name = "footprint",
    version,
    about = "footprint - concurrent OSINT identity signal investigation",
    after_help = "EXAMPLES:\n    \
                  footprint investigate --email jane@acme.com\n    \
                  footprint investigate --phone +14155550100 --only phone\n    \
                  footprint capabilities\n    \
                  footprint --config my.toml config --validate"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "footprint.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Investigate an email address and/or phone number
    Investigate {
        /// Target email address
        #[arg(short, long)]
        email: Option<String>,

        /// Target phone number in E.164 form (+<country><number>)
        #[arg(short, long)]
        phone: Option<String>,

        /// Only run these capabilities (comma separated ids)
        #[arg(long, value_delimiter = ',', value_parser = parse_capability)]
        only: Option<Vec<Capability>>,

        /// Results directory (overrides [storage] results_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the summary without saving the record
        #[arg(long)]
        no_save: bool,

        /// Print the full record as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List capabilities and whether a probe is registered for each
    Capabilities,

    /// Show configuration information
    Config {
        /// Validate the configuration file and report warnings
        #[arg(long)]
        validate: bool,
    },
}

fn parse_capability(s: &str) -> Result<Capability, String> {
    s.parse()
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
