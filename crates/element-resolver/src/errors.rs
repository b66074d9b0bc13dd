//! Error types for element resolution

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// `resolve` was called before any page was built
    #[error("no page tree has been built yet")]
    NoTree,

    /// Locator could not be parsed
    #[error("malformed locator: {0}")]
    MalformedLocator(String),

    /// Locator parsed but matched nothing in the last built page
    #[error("locator not found: {0}")]
    NotFound(String),

    /// External page renderer failed
    #[error("page renderer failed: {0}")]
    Renderer(String),

    /// External page renderer did not finish before the configured timeout
    #[error("page renderer timed out after {0}ms")]
    Timeout(u64),
}

impl ResolverError {
    pub fn renderer(msg: impl Into<String>) -> Self {
        Self::Renderer(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedLocator(msg.into())
    }

    /// Short label used in error sink records.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolverError::NoTree => "no_tree",
            ResolverError::MalformedLocator(_) => "malformed_locator",
            ResolverError::NotFound(_) => "not_found",
            ResolverError::Renderer(_) => "renderer",
            ResolverError::Timeout(_) => "timeout",
        }
    }
}
