//! al2sql CLI
//!
//! Converts an AL project (sources plus `.alpackages` symbols) into a MySQL script.

use al2sql::cli::commands::convert::{ConvertArgs, handle_convert};
use al2sql::cli::commands::parse::{ParseArgs, handle_parse};
use al2sql::cli::commands::symbols::{SymbolsArgs, handle_symbols};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "al2sql")]
#[command(author, version, about = "Convert AL table definitions into MySQL DDL", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the SQL script for a project
    Convert {
        /// Project directory
        project: PathBuf,

        /// Script destination
        #[arg(short, long, default_value = "schema.sql")]
        output: PathBuf,

        /// Only emit flattened extension tables
        #[arg(long)]
        no_source_tables: bool,

        /// Do not fall back to metadata-looking JSON entries in packages
        #[arg(long)]
        no_aggressive: bool,

        /// Archive tool executable (7-Zip)
        #[arg(long, value_name = "PATH")]
        archive_tool: Option<PathBuf>,

        /// Never run the external archive tool
        #[arg(long, conflicts_with = "archive_tool")]
        no_archive_tool: bool,

        /// Seconds allowed for each archive tool call
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        tool_timeout: Option<u64>,

        /// One column per line
        #[arg(long)]
        pretty: bool,

        /// No spinner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show the schema parsed from one AL file
    Parse {
        /// AL source file
        file: PathBuf,
    },

    /// List tables known from symbol files and packages
    Symbols {
        /// Project directory
        project: PathBuf,

        /// Never run the external archive tool
        #[arg(long)]
        no_archive_tool: bool,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "al2sql=warn",
        1 => "al2sql=info",
        2 => "al2sql=debug",
        _ => "al2sql=trace",
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json = matches!(cli.format, OutputFormat::Json);

    match cli.command {
        Commands::Convert {
            project,
            output,
            no_source_tables,
            no_aggressive,
            archive_tool,
            no_archive_tool,
            tool_timeout,
            pretty,
            quiet,
        } => {
            let args = ConvertArgs {
                project,
                output,
                config_file: cli.config,
                no_source_tables,
                no_aggressive,
                archive_tool,
                no_archive_tool,
                tool_timeout,
                pretty,
                json,
                quiet,
            };
            handle_convert(&args)?;
        }
        Commands::Parse { file } => {
            handle_parse(&ParseArgs {
                file,
                config_file: cli.config,
                json,
            })?;
        }
        Commands::Symbols {
            project,
            no_archive_tool,
        } => {
            handle_symbols(&SymbolsArgs {
                project,
                config_file: cli.config,
                no_archive_tool,
                json,
            })?;
        }
    }

    Ok(())
}
