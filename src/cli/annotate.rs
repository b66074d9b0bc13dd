use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use episode_model::{decode_episode, Episode};
use futures::stream::{FuturesOrdered, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinError;
use tracing::{info, warn};

use super::io::{open_input, open_output};
use crate::config::load_active_dataset;
use crate::thoughts::{AnnotateStats, Annotator, OpenAiThoughtProvider, ThoughtMemo};

#[derive(Args, Clone, Debug)]
pub struct AnnotateArgs {
    /// Canonical episodes as JSONL (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Append annotated episodes to this file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Append-only memo of generated thoughts
    #[arg(long, value_name = "FILE", default_value = "thoughts.memo.jsonl")]
    pub memo: PathBuf,

    /// Maximum provider calls in flight
    #[arg(short, long, default_value_t = 4)]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotateSummary {
    pub episodes: usize,
    pub skipped: usize,
    pub failed: usize,
    pub thoughts: AnnotateStats,
}

impl fmt::Display for AnnotateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "episodes={} skipped={} failed={} generated={} memoized={} generation_failures={}",
            self.episodes,
            self.skipped,
            self.failed,
            self.thoughts.generated,
            self.thoughts.memoized,
            self.thoughts.failed
        )
    }
}

pub async fn cmd_annotate(args: AnnotateArgs, datasets_dir: Option<&Path>) -> Result<()> {
    let dataset = load_active_dataset(datasets_dir).context("loading dataset configuration")?;
    let thoughts = dataset
        .config
        .thoughts
        .clone()
        .with_context(|| format!("dataset '{}' has no `thoughts` section", dataset.name()))?;
    let provider = OpenAiThoughtProvider::new(thoughts)?;
    let memo = ThoughtMemo::open(&args.memo)
        .await
        .with_context(|| format!("opening memo {}", args.memo.display()))?;
    let annotator = Arc::new(Annotator::new(
        Arc::new(provider),
        Arc::new(memo),
        args.concurrency,
    ));

    let input = open_input(args.input.as_deref()).await?;
    let output = open_output(args.output.as_deref()).await?;
    let summary = annotate_stream(annotator, input, output).await?;
    eprintln!("{summary}");
    Ok(())
}

/// Annotate every episode line of `input`, writing them to `output` in input
/// order. At most a small multiple of the annotator's concurrency is buffered;
/// each episode is written as soon as every episode before it is done.
pub async fn annotate_stream<R, W>(annotator: Arc<Annotator>, input: R, mut output: W) -> Result<AnnotateSummary>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = AnnotateSummary::default();
    let window = annotator.concurrency().saturating_mul(IN_FLIGHT_PER_PERMIT);
    let mut in_flight = FuturesOrdered::new();
    let mut lines = BufReader::new(input).lines();
    let mut line = 0usize;
    let mut exhausted = false;

    while !exhausted || !in_flight.is_empty() {
        tokio::select! {
            biased;
            Some(done) = in_flight.next(), if !in_flight.is_empty() => {
                write_annotated(done, &mut output, &mut summary).await?;
            }
            next = lines.next_line(), if !exhausted && in_flight.len() < window => {
                let Some(text) = next.context("reading episodes")? else {
                    exhausted = true;
                    continue;
                };
                line += 1;
                let Some(episode) = parse_episode(line, &text, &mut summary) else {
                    continue;
                };
                let annotator = Arc::clone(&annotator);
                let task = tokio::spawn(async move { annotator.annotate(episode).await });
                in_flight.push_back(async move { (line, task.await) });
            }
        }
    }

    output.flush().await.context("flushing annotated episodes")?;
    info!(%summary, "annotation run finished");
    Ok(summary)
}

const IN_FLIGHT_PER_PERMIT: usize = 2;

fn parse_episode(line: usize, text: &str, summary: &mut AnnotateSummary) -> Option<Episode> {
    if text.trim().is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            summary.skipped += 1;
            warn!(line, error = %err, "skipping malformed input line");
            return None;
        }
    };
    match decode_episode(&value) {
        Ok(episode) => Some(episode),
        Err(err) => {
            summary.failed += 1;
            warn!(line, episode = %err.episode_id, error = %err, "episode rejected");
            None
        }
    }
}

async fn write_annotated<W>(
    (line, joined): (usize, Result<(Episode, AnnotateStats), JoinError>),
    output: &mut W,
    summary: &mut AnnotateSummary,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let (episode, stats) = match joined {
        Ok(done) => done,
        Err(err) => {
            summary.failed += 1;
            warn!(line, error = %err, "annotation task aborted");
            return Ok(());
        }
    };
    summary.thoughts += stats;
    match serde_json::to_string(&episode) {
        Ok(mut json) => {
            json.push('\n');
            output
                .write_all(json.as_bytes())
                .await
                .context("writing annotated episodes")?;
            output.flush().await.context("flushing annotated episodes")?;
            summary.episodes += 1;
        }
        Err(err) => {
            summary.failed += 1;
            warn!(line, episode = %episode.id, error = %err, "serializing episode failed");
        }
    }
    Ok(())
}
