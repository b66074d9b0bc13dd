use std::ops::AddAssign;
use std::sync::Arc;

use episode_model::{Episode, Source, Step};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::memo::ThoughtMemo;
use super::provider::{ThoughtProvider, ThoughtRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnnotateStats {
    /// Descriptions filled from the memo without calling the provider.
    pub memoized: usize,
    pub generated: usize,
    /// Generations that failed; left empty and retried on the next run.
    pub failed: usize,
}

impl AddAssign for AnnotateStats {
    fn add_assign(&mut self, other: Self) {
        self.memoized += other.memoized;
        self.generated += other.generated;
        self.failed += other.failed;
    }
}

/// Fills missing action descriptions with at most `concurrency` provider
/// calls in flight across every episode sharing this annotator.
pub struct Annotator {
    provider: Arc<dyn ThoughtProvider>,
    memo: Arc<ThoughtMemo>,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl Annotator {
    pub fn new(provider: Arc<dyn ThoughtProvider>, memo: Arc<ThoughtMemo>, concurrency: usize) -> Self {
        Self {
            provider,
            memo,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            concurrency: concurrency.max(1),
        }
    }

    /// Maximum provider calls in flight.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn annotate(&self, mut episode: Episode) -> (Episode, AnnotateStats) {
        let mut stats = AnnotateStats::default();
        let mut fills = Vec::new();
        let mut pending = JoinSet::new();
        let goal = goal_of(&episode);

        for (index, step) in episode.steps.iter().enumerate() {
            if !needs_thought(step) {
                continue;
            }
            if let Some(thought) = self.memo.get(&episode.id, index) {
                stats.memoized += 1;
                fills.push((index, thought));
                continue;
            }

            let request = ThoughtRequest {
                episode_id: episode.id.clone(),
                step_index: index,
                goal: goal.clone(),
                history: episode.steps[..index].iter().map(Step::to_string).collect(),
                action: serde_json::to_string(step).unwrap_or_else(|_| step.to_string()),
            };
            let provider = Arc::clone(&self.provider);
            let memo = Arc::clone(&self.memo);
            let permits = Arc::clone(&self.permits);
            pending.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (index, None);
                };
                match provider.generate(&request).await {
                    Ok(thought) => {
                        if let Err(err) = memo.record(&request.episode_id, index, &thought).await {
                            warn!(episode = %request.episode_id, step = index, error = %err, "memo append failed");
                        }
                        (index, Some(thought))
                    }
                    Err(err) => {
                        warn!(episode = %request.episode_id, step = index, error = %err, "thought generation failed");
                        (index, None)
                    }
                }
            });
        }

        while let Some(joined) = pending.join_next().await {
            match joined {
                Ok((index, Some(thought))) => {
                    stats.generated += 1;
                    fills.push((index, thought));
                }
                Ok((_, None)) => stats.failed += 1,
                Err(err) => {
                    stats.failed += 1;
                    warn!(episode = %episode.id, error = %err, "thought task aborted");
                }
            }
        }

        for (index, thought) in fills {
            if let Some(slot) = episode.steps.get_mut(index).and_then(Step::description_mut) {
                *slot = Some(thought);
            }
        }
        (episode, stats)
    }
}

fn needs_thought(step: &Step) -> bool {
    step.is_action() && step.description().map_or(true, |text| text.trim().is_empty())
}

/// First user utterance, used as the task statement.
fn goal_of(episode: &Episode) -> Option<String> {
    episode.steps.iter().find_map(|step| match step {
        Step::TextObservation(text) if text.source == Source::User => Some(text.content.clone()),
        _ => None,
    })
}
