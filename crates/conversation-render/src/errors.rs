use episode_model::ValidationError;
use thiserror::Error;
use tool_vocabulary::VocabularyError;

/// Fatal failures that drop a whole episode.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An action could not be mapped onto any calling convention.
    #[error("episode '{episode_id}' step {index}: {source}")]
    Vocabulary {
        episode_id: String,
        index: usize,
        #[source]
        source: VocabularyError,
    },

    /// The episode failed canonical validation before rendering.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl RenderError {
    pub fn vocabulary(episode_id: &str, index: usize, source: VocabularyError) -> Self {
        Self::Vocabulary {
            episode_id: episode_id.to_string(),
            index,
            source,
        }
    }

    pub fn episode_id(&self) -> &str {
        match self {
            RenderError::Vocabulary { episode_id, .. } => episode_id,
            RenderError::Invalid(err) => &err.episode_id,
        }
    }

    /// Failure category reported in logs and run summaries.
    pub fn label(&self) -> &'static str {
        match self {
            RenderError::Vocabulary { source, .. } => source.label(),
            RenderError::Invalid(err) if err.has_unknown_variant() => "unknown_variant",
            RenderError::Invalid(_) => "invalid_episode",
        }
    }
}
