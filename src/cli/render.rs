use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use conversation_render::{ConversationRenderer, RenderOptions};
use element_resolver::ErrorSink;
use tracing::info;

use super::io::{open_input, open_output};
use crate::config::load_active_dataset;
use crate::pipeline::RenderPipeline;

#[derive(Args, Clone, Debug)]
pub struct RenderArgs {
    /// Canonical episodes as JSONL (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Append wire records to this file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of render workers (default: available parallelism)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Mirror resolver failures to this JSONL file
    #[arg(long, value_name = "FILE")]
    pub errors: Option<PathBuf>,
}

pub async fn cmd_render(args: RenderArgs, datasets_dir: Option<&Path>) -> Result<()> {
    let dataset = load_active_dataset(datasets_dir).context("loading dataset configuration")?;
    let page_renderer = dataset.page_renderer()?;
    let sink = match args.errors.as_deref() {
        Some(path) => ErrorSink::with_file(path)
            .with_context(|| format!("opening error sink {}", path.display()))?,
        None => ErrorSink::new(),
    };

    let renderer = ConversationRenderer::new(
        Arc::clone(&dataset.vocabulary),
        RenderOptions {
            web: dataset.config.web,
            tool_description: dataset.tool_description.clone(),
        },
    );
    let workers = args.workers.unwrap_or_else(default_workers);
    info!(dataset = %dataset.name(), workers, "rendering episodes");

    let pipeline = RenderPipeline::new(
        Arc::new(renderer),
        page_renderer,
        Arc::new(sink),
        &dataset.config.system_prompt,
        workers,
    );
    let input = open_input(args.input.as_deref()).await?;
    let output = open_output(args.output.as_deref()).await?;
    let (summary, _) = pipeline.run(input, output).await?;
    eprintln!("{summary}");
    Ok(())
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(4)
}
