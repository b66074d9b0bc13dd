use clap::Parser;
use std::path::PathBuf;

use super::commands::Commands;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Log level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Emit diagnostics as JSON lines
    #[arg(long)]
    pub log_json: bool,

    /// Directory holding `<dataset>/dataset.yaml` folders
    #[arg(long, value_name = "DIR", global = true)]
    pub datasets_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
