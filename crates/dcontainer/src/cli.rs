use crate::commands::feature::{execute_generate_dependencies, GenerateDependenciesArgs};
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log format options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON structured format
    Json,
}

/// Log level options
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Error messages only
    Error,
    /// Warning and error messages
    Warn,
    /// Informational messages and above
    Info,
    /// Debug messages and above
    Debug,
    /// All messages including trace
    Trace,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// dcontainer subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Feature authoring commands
    Feature {
        #[command(subcommand)]
        command: FeatureCommands,
    },
}

/// Feature subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum FeatureCommands {
    /// Generate the script installing a feature's dependencies
    ///
    /// Reads a feature-definition.json and renders a bash script that
    /// bootstraps the dcontainer CLI and installs every declared dependency.
    /// Nothing is written when the feature declares no dependencies.
    GenerateDependencies {
        /// Path to the feature-definition.json file
        path: PathBuf,
        /// Release version the script pins the CLI to (defaults to this build's version)
        #[arg(long)]
        release_version: Option<String>,
        /// TOML file overriding generator settings (env prefix, CLI name, download URL)
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,
        /// Write the script to this file instead of stdout
        #[arg(long, short = 'o', value_name = "PATH")]
        output: Option<PathBuf>,
        /// Print a JSON summary to stdout (requires --output)
        #[arg(long, requires = "output")]
        json: bool,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Development container feature tooling",
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Log format (text or json, defaults to text, can be set via DCONTAINER_LOG_FORMAT env var)
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Initialize logging and run the selected subcommand
    pub fn dispatch(self) -> Result<()> {
        let log_format = match self.log_format {
            Some(LogFormat::Text) => Some("text"),
            Some(LogFormat::Json) => Some("json"),
            None => None, // Let logging module check environment variable
        };

        let log_level = self.log_level.as_str();
        dcontainer_core::logging::init(
            log_format,
            &format!("dcontainer={},dcontainer_core={}", log_level, log_level),
        )?;
        tracing::debug!("CLI initialized with log level: {}", log_level);

        match self.command {
            Some(Commands::Feature { command }) => match command {
                FeatureCommands::GenerateDependencies {
                    path,
                    release_version,
                    settings,
                    output,
                    json,
                } => execute_generate_dependencies(GenerateDependenciesArgs {
                    path,
                    release_version,
                    settings,
                    output,
                    json,
                }),
            },
            None => {
                // No subcommand provided - show help-like message
                println!("Development container feature tooling");
                println!("Run 'dcontainer --help' to see available commands.");
                Ok(())
            }
        }
    }
}
