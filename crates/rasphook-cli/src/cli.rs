//! CLI argument definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rasphook",
    about = "Issue script-style asynchronous HTTP requests through a rasphook engine",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (YAML or JSON)
    #[arg(long, env = "RASPHOOK_SETTINGS", help = "Path to a YAML or JSON settings file")]
    pub settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Issue one request and print the settled result
    Request {
        /// Request configuration as inline JSON
        #[arg(long = "config-json", conflicts_with = "file")]
        config_json: Option<String>,

        /// Request configuration file (JSON or YAML)
        #[arg(long, short)]
        file: Option<String>,

        /// Send the file's raw bytes as the request body
        #[arg(long = "data-file")]
        data_file: Option<String>,

        /// How long to pump for the result
        #[arg(long = "wait-ms", default_value = "5000")]
        wait_ms: u64,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// Print the effective settings
    Settings {
        #[arg(long, value_enum, default_value = "yaml")]
        format: SettingsFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingsFormat {
    Yaml,
    Json,
}
