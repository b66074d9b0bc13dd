use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use episode_model::decode_episode;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::io::open_input;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Canonical episodes as JSONL (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

pub async fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let input = open_input(args.input.as_deref()).await?;
    let mut lines = BufReader::new(input).lines();
    let (mut valid, mut invalid, mut malformed) = (0usize, 0usize, 0usize);
    let mut number = 0usize;

    while let Some(text) = lines.next_line().await.context("reading episodes")? {
        number += 1;
        if text.trim().is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                malformed += 1;
                println!("line {number}: malformed JSON: {err}");
                continue;
            }
        };
        match decode_episode(&value) {
            Ok(_) => valid += 1,
            Err(err) => {
                invalid += 1;
                for issue in &err.issues {
                    println!("line {number}: episode '{}': [{}] {issue}", err.episode_id, issue.label());
                }
            }
        }
    }

    println!("{valid} valid, {invalid} invalid, {malformed} malformed");
    if invalid + malformed > 0 {
        bail!("{} of {} lines failed validation", invalid + malformed, valid + invalid + malformed);
    }
    Ok(())
}
