//! Thought synthesis: fill missing action descriptions through a text
//! generation provider, memoized per `(episode_id, step_index)`.

mod annotator;
mod memo;
mod provider;

pub use annotator::{AnnotateStats, Annotator};
pub use memo::{MemoEntry, ThoughtMemo};
pub use provider::{OpenAiThoughtProvider, ThoughtError, ThoughtProvider, ThoughtRequest};
