//! The RAG session: owns the index lifecycle and answers questions.
//!
//! Exactly one session is built per process and shared behind an `Arc`.
//! Initialization runs at most once; concurrent callers queue on the init
//! lock and observe the first run's outcome.
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::embedder::Embedder;
use crate::error::{RagError, Result};
use crate::generator::prompt::PromptTemplate;
use crate::generator::{Generator, Synthesizer};
use crate::index::VectorIndex;
use crate::index::models::{ChatAnswer, RetrievalResult};
use crate::index::store;
use crate::indexer::chunker::Chunker;
use crate::indexer::loader;
use crate::retriever::Retriever;

/// Observable lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Uninitialized,
    Initializing,
    Ready,
    /// Terminal; carries the reason of the failed initialization.
    Failed(String),
}

impl SessionStatus {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Initializing => f.write_str("initializing"),
            Self::Ready => f.write_str("ready"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

enum State {
    Uninitialized,
    Initializing,
    Ready(Retriever),
    Failed(String),
}

pub struct RagSession {
    config: Config,
    embedder: Arc<dyn Embedder>,
    synthesizer: Synthesizer,
    state: RwLock<State>,
    init_lock: Mutex<()>,
}

impl RagSession {
    /// Build an uninitialized session. Rejects invalid configuration.
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Configuration(format!("{e:#}")))?;

        let synthesizer = Synthesizer::new(generator, PromptTemplate::from_persona(&config.persona));
        Ok(Self {
            config,
            embedder,
            synthesizer,
            state: RwLock::new(State::Uninitialized),
            init_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn status(&self) -> SessionStatus {
        match &*self.state.read().await {
            State::Uninitialized => SessionStatus::Uninitialized,
            State::Initializing => SessionStatus::Initializing,
            State::Ready(_) => SessionStatus::Ready,
            State::Failed(reason) => SessionStatus::Failed(reason.clone()),
        }
    }

    /// Number of indexed chunks, once ready.
    pub async fn chunk_count(&self) -> Option<usize> {
        match &*self.state.read().await {
            State::Ready(retriever) => Some(retriever.index().len()),
            _ => None,
        }
    }

    /// Restore the persisted index, or rebuild it from the corpus.
    ///
    /// Idempotent once `Ready`. After a failure every later call returns
    /// [`RagError::Configuration`] with the original reason.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.init_lock.lock().await;

        match &*self.state.read().await {
            State::Ready(_) => return Ok(()),
            State::Failed(reason) => {
                return Err(RagError::Configuration(format!(
                    "initialization previously failed: {reason}"
                )));
            }
            State::Uninitialized | State::Initializing => {}
        }

        *self.state.write().await = State::Initializing;
        info!(status = %SessionStatus::Initializing, "RAG session starting");

        match self.load_or_build().await {
            Ok(index) => {
                info!(chunks = index.len(), "RAG session ready");
                let retriever = Retriever::new(
                    Arc::new(index),
                    self.embedder.clone(),
                    self.config.retrieval_k,
                );
                *self.state.write().await = State::Ready(retriever);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "RAG session initialization failed");
                *self.state.write().await = State::Failed(e.to_string());
                Err(e)
            }
        }
    }

    async fn load_or_build(&self) -> Result<VectorIndex> {
        let path = Path::new(&self.config.index_path);
        if let Some(index) = restore_compatible(path, self.embedder.as_ref())? {
            return Ok(index);
        }
        rebuild_index(&self.config, self.embedder.as_ref()).await
    }

    /// Answer one question from the indexed corpus.
    ///
    /// The question is passed through as given; length limits belong to the caller.
    pub async fn answer(&self, question: &str) -> Result<ChatAnswer> {
        let retriever = match &*self.state.read().await {
            State::Ready(retriever) => retriever.clone(),
            _ => return Err(RagError::NotReady),
        };

        let retrieved = retriever.retrieve(question).await?;
        let answer = self.synthesizer.synthesize(question, &retrieved).await?;

        Ok(ChatAnswer {
            question: question.to_string(),
            answer,
            sources: unique_sources(&retrieved),
        })
    }
}

/// Restore the artifact at `path` if `embedder` can query it.
///
/// `Ok(None)` means the artifact is missing, damaged or built with a
/// different dimensionality, and should be rebuilt from the corpus.
pub fn restore_compatible(path: &Path, embedder: &dyn Embedder) -> Result<Option<VectorIndex>> {
    match VectorIndex::restore(path) {
        Ok(index) if index.dimensions() != embedder.dimensions() => {
            warn!(
                artifact_dimensions = index.dimensions(),
                embedder_dimensions = embedder.dimensions(),
                "index artifact has the wrong dimensionality, rebuilding"
            );
            Ok(None)
        }
        Ok(index) => {
            store::warn_on_model_mismatch(&index, embedder.model_name());
            Ok(Some(index))
        }
        Err(e) if e.is_recoverable_by_rebuild() => {
            info!(reason = %e, "no usable index artifact, rebuilding from corpus");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Load the corpus, chunk it, embed it and persist the artifact.
///
/// A corpus directory with no readable documents is a configuration error.
pub async fn rebuild_index(config: &Config, embedder: &dyn Embedder) -> Result<VectorIndex> {
    let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
    let data_path = Path::new(&config.data_path);

    let report = loader::load_documents(data_path)?;
    if report.documents.is_empty() {
        return Err(RagError::Configuration(format!(
            "no documents found in {} ({} files skipped)",
            data_path.display(),
            report.skipped.len()
        )));
    }

    let chunks = chunker.split_documents(&report.documents);
    info!(
        documents = report.documents.len(),
        skipped = report.skipped.len(),
        chunks = chunks.len(),
        chunk_size = chunker.chunk_size(),
        chunk_overlap = chunker.chunk_overlap(),
        "corpus chunked"
    );

    let index = VectorIndex::build(chunks, embedder, config.embedding.batch_size).await?;
    index.persist(Path::new(&config.index_path))?;
    Ok(index)
}

/// Provenance of `retrieved`, deduplicated by first occurrence.
fn unique_sources(retrieved: &RetrievalResult) -> Vec<String> {
    let mut sources: Vec<String> = Vec::with_capacity(retrieved.len());
    for r in retrieved {
        if !sources.contains(&r.chunk.provenance) {
            sources.push(r.chunk.provenance.clone());
        }
    }
    sources
}
