use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

#[derive(Parser)]
#[command(name = "damage-survey")]
#[command(about = "Property damage registration survey", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Submission database (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Location catalog (overrides the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// -v for debug, -vv for trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export JSON Schemas for the stored and exported record types
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// List sectors, the villages of a sector, or a village's property numbers
    Catalog {
        #[arg(long)]
        sector: Option<String>,
        #[arg(long, requires = "sector")]
        village: Option<String>,
    },
    /// Walk an answers file through the form and submit it
    Fill {
        #[arg(required_unless_present = "resume")]
        answers: Option<PathBuf>,
        /// Continue from the saved draft's step, with the answers file's
        /// values when one is given
        #[arg(long)]
        resume: bool,
        /// Keep everything in memory; nothing is stored
        #[arg(long)]
        dry_run: bool,
    },
    /// Inspect or discard the saved in-progress form
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Stored submissions and remaining capacity
    Status,
    /// Write every stored submission to a dated sheet
    Export {
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum DraftCommands {
    Show,
    Clear,
}
