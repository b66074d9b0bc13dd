use thiserror::Error;

/// Errors raised while loading catalogs or reconciling an action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VocabularyError {
    /// Provided arguments violate the chosen convention's required/optional contract.
    #[error(
        "argument mismatch for {convention} call '{function}': provided [{}], required [{}], optional [{}]",
        .provided.join(", "),
        .required.join(", "),
        .optional.join(", ")
    )]
    ArgumentMismatch {
        function: String,
        convention: &'static str,
        provided: Vec<String>,
        required: Vec<String>,
        optional: Vec<String>,
    },

    /// Function is not declared in any catalog usable in this context.
    #[error("unknown function '{function}' (web context: {web})")]
    UnknownFunction { function: String, web: bool },

    /// Catalog or manifest file could not be loaded.
    #[error("invalid tool catalog: {0}")]
    Catalog(String),
}

impl VocabularyError {
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    pub fn label(&self) -> &'static str {
        match self {
            VocabularyError::ArgumentMismatch { .. } => "argument_mismatch",
            VocabularyError::UnknownFunction { .. } => "unknown_function",
            VocabularyError::Catalog(_) => "catalog",
        }
    }
}
