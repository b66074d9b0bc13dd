use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use episode_model::Episode;
use tokio::fs;

#[derive(Args, Clone, Debug)]
pub struct SchemaArgs {
    /// Write the schema to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn episode_schema() -> Result<String> {
    let schema = schemars::schema_for!(Episode);
    serde_json::to_string_pretty(&schema).context("encoding episode schema")
}

pub async fn cmd_schema(args: SchemaArgs) -> Result<()> {
    let text = episode_schema()?;
    match args.output {
        Some(path) => {
            fs::write(&path, format!("{text}\n"))
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Episode schema written to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
