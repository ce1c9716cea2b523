//! Error taxonomy shared by every stage of the answering pipeline.

use thiserror::Error;

use crate::embedder::EmbedderError;

/// Errors surfaced by the loader, index, session and model adapters.
#[derive(Error, Debug)]
pub enum RagError {
    /// Missing corpus directory or missing persisted artifact.
    #[error("not found: {0}")]
    NotFound(String),

    /// Corpus present but unusable, or invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Persisted artifact unreadable or in an unexpected shape.
    #[error("corrupt index artifact: {0}")]
    CorruptArtifact(String),

    /// An index was requested over zero chunks.
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// `answer` was called before the session reached `Ready`.
    #[error("session is not ready")]
    NotReady,

    /// Embedding or generative-model invocation failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Writing the artifact failed.
    #[error("failed to persist index: {0}")]
    Persistence(String),
}

impl RagError {
    /// Whether initialization may fall back to rebuilding from the corpus.
    #[must_use]
    pub fn is_recoverable_by_rebuild(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::CorruptArtifact(_))
    }
}

impl From<EmbedderError> for RagError {
    fn from(e: EmbedderError) -> Self {
        Self::Generation(e.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants() {
        assert!(RagError::NotFound("x".into()).is_recoverable_by_rebuild());
        assert!(RagError::CorruptArtifact("x".into()).is_recoverable_by_rebuild());
        assert!(!RagError::EmptyCorpus.is_recoverable_by_rebuild());
        assert!(!RagError::NotReady.is_recoverable_by_rebuild());
    }

    #[test]
    fn test_embedder_error_maps_to_generation() {
        let err: RagError = EmbedderError::RequestFailed("timeout".into()).into();
        assert!(matches!(err, RagError::Generation(ref m) if m.contains("timeout")));
    }
}
