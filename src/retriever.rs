use std::sync::Arc;

use tracing::debug;

use crate::embedder::Embedder;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::index::models::RetrievalResult;

/// Top-K retrieval over a built [`VectorIndex`].
///
/// The embedder must be the one the index was built with.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `question` and return the `top_k` closest chunks.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        let query = self.embedder.embed(question).await?;
        let results = self.index.search(&query, self.top_k);
        debug!(
            hits = results.len(),
            best = results.first().map(|r| r.score),
            "retrieved chunks"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use crate::index::models::Chunk;

    async fn build(texts: &[(&str, &str)], embedder: &Arc<MockEmbedder>) -> Arc<VectorIndex> {
        let chunks = texts
            .iter()
            .map(|(t, p)| Chunk {
                text: t.to_string(),
                provenance: p.to_string(),
            })
            .collect();
        Arc::new(VectorIndex::build(chunks, embedder.as_ref(), 8).await.unwrap())
    }

    #[tokio::test]
    async fn test_retrieve_respects_top_k() {
        let embedder = Arc::new(MockEmbedder::default());
        let index = build(
            &[
                ("Rust systems programming", "rust.md"),
                ("Python machine learning", "ml.txt"),
                ("Contact by email", "contact.txt"),
            ],
            &embedder,
        )
        .await;

        let retriever = Retriever::new(index, embedder.clone(), 2);
        let results = retriever.retrieve("Python machine learning").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.provenance, "ml.txt");
    }

    #[tokio::test]
    async fn test_retrieve_fewer_chunks_than_k() {
        let embedder = Arc::new(MockEmbedder::default());
        let index = build(&[("only one chunk", "one.txt")], &embedder).await;

        let retriever = Retriever::new(index, embedder.clone(), 6);
        let results = retriever.retrieve("anything").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(retriever.top_k(), 6);
    }
}
