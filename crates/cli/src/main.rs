use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use survey_core::SurveyConfig;

mod answers;
mod cli;
mod commands;
mod logging;

use crate::cli::{Cli, Commands, DraftCommands, SchemaCommands};
use crate::logging::{LogConfig, LogFormat, init_logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = settings(&cli)?;

    let format = match cli.log_format {
        Some(format) => format,
        None => LogFormat::from_str(&config.log.format, true)
            .map_err(|_| anyhow!("unknown log format {:?} in config", config.log.format))?,
    };
    init_logging(&LogConfig::from_verbosity(cli.verbose).with_format(format));

    match cli.command {
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => commands::schema_export(out_dir),
        },
        Commands::Catalog { sector, village } => {
            commands::catalog(&config, sector.as_deref(), village.as_deref())
        }
        Commands::Fill {
            answers,
            resume,
            dry_run,
        } => commands::fill(&config, answers.as_deref(), resume, dry_run),
        Commands::Draft { command } => match command {
            DraftCommands::Show => commands::draft_show(&config),
            DraftCommands::Clear => commands::draft_clear(&config),
        },
        Commands::Status => commands::status(&config),
        Commands::Export { out_dir, title } => commands::export(&config, out_dir, title),
    }
}

/// Config file values with command-line overrides applied.
fn settings(cli: &Cli) -> Result<SurveyConfig> {
    let mut config = SurveyConfig::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    if let Some(catalog) = &cli.catalog {
        config.catalog = catalog.clone();
    }
    Ok(config)
}
