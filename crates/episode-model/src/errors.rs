use thiserror::Error;

/// A single rule violated by a canonical episode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("episode is not a JSON object")]
    NotAnObject,
    #[error("episode id is missing or empty")]
    MissingId,
    #[error("episode has no steps")]
    EmptySteps,
    #[error("step {index} is missing its type tag")]
    MissingTag { index: usize },
    #[error("step {index} has unrecognized type '{tag}'")]
    UnknownTag { index: usize, tag: String },
    #[error("step {index} ({tag}) is malformed: {reason}")]
    MalformedStep {
        index: usize,
        tag: String,
        reason: String,
    },
    #[error("step {index} ({tag}) requires a non-empty '{field}'")]
    EmptyField {
        index: usize,
        tag: &'static str,
        field: &'static str,
    },
    #[error("step {index} web_observation carries neither html, axtree, url nor image")]
    EmptyWebObservation { index: usize },
    #[error("step {index} web_observation viewport must be positive, got {width}x{height}")]
    InvalidViewport {
        index: usize,
        width: u32,
        height: u32,
    },
}

impl ValidationIssue {
    /// Short stable label used in logs and run summaries.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationIssue::NotAnObject => "not_an_object",
            ValidationIssue::MissingId => "missing_id",
            ValidationIssue::EmptySteps => "empty_steps",
            ValidationIssue::MissingTag { .. } => "missing_tag",
            ValidationIssue::UnknownTag { .. } => "unknown_tag",
            ValidationIssue::MalformedStep { .. } => "malformed_step",
            ValidationIssue::EmptyField { .. } => "empty_field",
            ValidationIssue::EmptyWebObservation { .. } => "empty_web_observation",
            ValidationIssue::InvalidViewport { .. } => "invalid_viewport",
        }
    }

    /// Whether the violation stems from an unrecognized step variant.
    pub fn is_unknown_variant(&self) -> bool {
        matches!(
            self,
            ValidationIssue::UnknownTag { .. } | ValidationIssue::MissingTag { .. }
        )
    }
}

/// All issues found in one episode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("episode '{episode_id}' failed validation: {}", summarize(.issues))]
pub struct ValidationError {
    pub episode_id: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(episode_id: impl Into<String>, issues: Vec<ValidationIssue>) -> Self {
        Self {
            episode_id: episode_id.into(),
            issues,
        }
    }

    pub fn has_unknown_variant(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_unknown_variant)
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}
