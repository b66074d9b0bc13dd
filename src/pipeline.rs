//! Concurrent JSONL render pipeline.
//!
//! One reader feeds a fixed pool of workers; each worker owns its own
//! [`ElementResolver`] and renders on the blocking pool; a single writer task
//! serializes output lines.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use conversation_render::ConversationRenderer;
use element_resolver::{ElementResolver, ErrorSink, PageRenderer};
use episode_model::decode_episode;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const CHANNEL_DEPTH: usize = 256;

/// Counts reported at the end of every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rendered: usize,
    /// Input lines that were not JSON at all.
    pub skipped: usize,
    /// Episodes dropped by validation, reconciliation or serialization.
    pub failed: usize,
    pub resolver_misses: usize,
    /// Page trees the renderer failed to build; not counted as misses.
    pub page_build_failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rendered={} skipped={} failed={} resolver_misses={}",
            self.rendered, self.skipped, self.failed, self.resolver_misses
        )
    }
}

#[derive(Default)]
struct Counters {
    rendered: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

struct Job {
    line: usize,
    value: Value,
}

pub struct RenderPipeline {
    renderer: Arc<ConversationRenderer>,
    page_renderer: Arc<dyn PageRenderer>,
    sink: Arc<ErrorSink>,
    system_prompt: Arc<str>,
    workers: usize,
}

impl RenderPipeline {
    pub fn new(
        renderer: Arc<ConversationRenderer>,
        page_renderer: Arc<dyn PageRenderer>,
        sink: Arc<ErrorSink>,
        system_prompt: &str,
        workers: usize,
    ) -> Self {
        Self {
            renderer,
            page_renderer,
            sink,
            system_prompt: Arc::from(system_prompt),
            workers: workers.max(1),
        }
    }

    pub fn sink(&self) -> &Arc<ErrorSink> {
        &self.sink
    }

    /// Render every episode line of `input` into `output`. Returns the run
    /// summary and the output writer once everything is flushed.
    pub async fn run<R, W>(&self, input: R, output: W) -> Result<(RunSummary, W)>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let counters = Arc::new(Counters::default());
        let misses_before = self.sink.misses();
        let build_failures_before = self.sink.build_failures();

        let (line_tx, line_rx) = mpsc::channel::<String>(CHANNEL_DEPTH);
        let writer = spawn_writer(output, line_rx);

        let (job_tx, job_rx) = mpsc::channel::<Job>(CHANNEL_DEPTH);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut workers = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            workers.push(self.spawn_worker(
                worker,
                Arc::clone(&job_rx),
                line_tx.clone(),
                Arc::clone(&counters),
            ));
        }
        drop(line_tx);

        let mut lines = BufReader::new(input).lines();
        let mut line = 0usize;
        while let Some(text) = lines.next_line().await.context("reading episodes")? {
            line += 1;
            if text.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => {
                    if job_tx.send(Job { line, value }).await.is_err() {
                        warn!(line, "all render workers exited early");
                        break;
                    }
                }
                Err(err) => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                    warn!(line, error = %err, "skipping malformed input line");
                }
            }
        }
        drop(job_tx);

        for handle in workers {
            handle.await.context("render worker panicked")?;
        }
        let output = writer
            .await
            .context("output writer panicked")?
            .context("writing rendered episodes")?;

        let summary = RunSummary {
            rendered: counters.rendered.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            resolver_misses: self.sink.misses().saturating_sub(misses_before),
            page_build_failures: self
                .sink
                .build_failures()
                .saturating_sub(build_failures_before),
        };
        info!(
            %summary,
            page_build_failures = summary.page_build_failures,
            "render run finished"
        );
        Ok((summary, output))
    }

    fn spawn_worker(
        &self,
        worker: usize,
        jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
        lines: mpsc::Sender<String>,
        counters: Arc<Counters>,
    ) -> JoinHandle<()> {
        let renderer = Arc::clone(&self.renderer);
        let page_renderer = Arc::clone(&self.page_renderer);
        let sink = Arc::clone(&self.sink);
        let system_prompt = Arc::clone(&self.system_prompt);

        tokio::spawn(async move {
            let mut resolver = Some(ElementResolver::new(
                Arc::clone(&page_renderer),
                Arc::clone(&sink),
            ));
            loop {
                let job = { jobs.lock().await.recv().await };
                let Some(Job { line, value }) = job else {
                    break;
                };

                let episode = match decode_episode(&value) {
                    Ok(episode) => episode,
                    Err(err) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(worker, line, episode = %err.episode_id, error = %err, "episode rejected");
                        continue;
                    }
                };

                let mut owned = resolver.take().unwrap_or_else(|| {
                    ElementResolver::new(Arc::clone(&page_renderer), Arc::clone(&sink))
                });
                let task_renderer = Arc::clone(&renderer);
                let task_prompt = Arc::clone(&system_prompt);
                let joined = tokio::task::spawn_blocking(move || {
                    let outcome = task_renderer.render(&episode, &mut owned).map(|rendered| {
                        let record = task_renderer.wire_record(&episode, &task_prompt, rendered);
                        serde_json::to_string(&record)
                    });
                    (owned, episode.id, outcome)
                })
                .await;

                let (returned, episode_id, outcome) = match joined {
                    Ok(parts) => parts,
                    Err(err) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(worker, line, error = %err, "render task aborted");
                        continue;
                    }
                };
                resolver = Some(returned);

                match outcome {
                    Ok(Ok(json)) => {
                        if lines.send(json).await.is_err() {
                            warn!(worker, "output writer closed");
                            break;
                        }
                        counters.rendered.fetch_add(1, Ordering::Relaxed);
                        debug!(worker, line, episode = %episode_id, "episode written");
                    }
                    Ok(Err(err)) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(worker, line, episode = %episode_id, error = %err, "serializing episode failed");
                    }
                    Err(err) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            worker,
                            line,
                            episode = %err.episode_id(),
                            kind = err.label(),
                            error = %err,
                            "episode dropped"
                        );
                    }
                }
            }
        })
    }
}

fn spawn_writer<W>(mut output: W, mut lines: mpsc::Receiver<String>) -> JoinHandle<std::io::Result<W>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(mut line) = lines.recv().await {
            line.push('\n');
            output.write_all(line.as_bytes()).await?;
        }
        output.flush().await?;
        Ok(output)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_display_lists_every_counter() {
        let summary = RunSummary {
            rendered: 3,
            skipped: 1,
            failed: 2,
            resolver_misses: 0,
            page_build_failures: 4,
        };
        assert_eq!(
            summary.to_string(),
            "rendered=3 skipped=1 failed=2 resolver_misses=0"
        );
    }
}
