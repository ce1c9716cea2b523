//! Vector index: embeddings co-indexed 1:1 with chunks, searched by cosine
//! similarity, persisted as a SQLite + sqlite-vec artifact.
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::embedder::Embedder;
use crate::error::{RagError, Result};

pub mod models;
pub mod store;

use models::{Chunk, RetrievalResult, RetrievedChunk};

/// An immutable set of `(vector, chunk)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    model: String,
    dimensions: usize,
    built_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Embed every chunk (in batches of `batch_size`) and build the index.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn Embedder,
        batch_size: usize,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(chunks.len());

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embedded = embedder.embed_batch(&texts).await?;
            if embedded.len() != texts.len() {
                return Err(RagError::Generation(format!(
                    "embedder returned {} vectors for {} chunks",
                    embedded.len(),
                    texts.len()
                )));
            }
            debug!(batch = batch_no, size = texts.len(), "embedded chunk batch");
            vectors.extend(embedded);
        }

        let index = Self::from_parts(
            embedder.model_name().to_string(),
            embedder.dimensions(),
            Utc::now(),
            chunks,
            vectors,
        )
        .map_err(|e| RagError::Generation(e.to_string()))?;

        info!(
            chunks = index.len(),
            dimensions = index.dimensions,
            model = %index.model,
            "vector index built"
        );
        Ok(index)
    }

    /// Assemble an index from already-embedded parts, checking alignment.
    pub(crate) fn from_parts(
        model: String,
        dimensions: usize,
        built_at: DateTime<Utc>,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.len() != vectors.len() {
            return Err(RagError::CorruptArtifact(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }
        if let Some(pos) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(RagError::CorruptArtifact(format!(
                "vector {pos} has {} dimensions, expected {dimensions}",
                vectors[pos].len()
            )));
        }

        Ok(Self {
            model,
            dimensions,
            built_at,
            chunks,
            vectors,
        })
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embedding model the vectors were produced with.
    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    #[must_use]
    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order. Returns `min(k, len)` entries.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> RetrievalResult {
        if query.len() != self.dimensions {
            warn!(
                query_dims = query.len(),
                index_dims = self.dimensions,
                "query vector dimensionality differs from index"
            );
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let score = cosine_similarity(v, query);
                (i, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        // stable sort keeps insertion order among ties
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| RetrievedChunk {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect()
    }

    /// Write the artifact to `path`, atomically replacing any previous one.
    pub fn persist(&self, path: &Path) -> Result<()> {
        store::write(self, path)
    }

    /// Load a previously persisted artifact without re-embedding.
    pub fn restore(path: &Path) -> Result<Self> {
        store::read(path)
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use proptest::prelude::*;

    pub(crate) fn chunk(text: &str, provenance: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            provenance: provenance.to_string(),
        }
    }

    pub(crate) fn sample_index() -> VectorIndex {
        VectorIndex::from_parts(
            "test-model".to_string(),
            3,
            Utc::now(),
            vec![
                chunk("alpha", "a.txt"),
                chunk("beta", "b.txt"),
                chunk("gamma", "a.txt"),
                chunk("delta", "c.md"),
            ],
            vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.7, 0.7, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_exact_match_first() {
        let index = sample_index();
        let results = index.search(&[0.0, 1.0, 0.0], 4);

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].chunk.text, "beta");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].chunk.text, "gamma");
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_search_bounded_by_k_and_len() {
        let index = sample_index();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).len(), 2);
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).len(), 4);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).is_empty());
    }

    #[test]
    fn test_search_ties_keep_insertion_order() {
        let index = VectorIndex::from_parts(
            "m".to_string(),
            2,
            Utc::now(),
            vec![chunk("first", "x"), chunk("second", "y"), chunk("third", "z")],
            vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        )
        .unwrap();

        let texts: Vec<String> = index
            .search(&[1.0, 0.0], 3)
            .into_iter()
            .map(|r| r.chunk.text)
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_from_parts_rejects_misaligned() {
        let err = VectorIndex::from_parts(
            "m".to_string(),
            2,
            Utc::now(),
            vec![chunk("a", "x")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::CorruptArtifact(_)));

        let err = VectorIndex::from_parts(
            "m".to_string(),
            2,
            Utc::now(),
            vec![chunk("a", "x")],
            vec![vec![1.0, 0.0, 0.0]],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::CorruptArtifact(_)));
    }

    #[tokio::test]
    async fn test_build_empty_corpus() {
        let embedder = MockEmbedder::new(8);
        let err = VectorIndex::build(Vec::new(), &embedder, 4).await.unwrap_err();
        assert!(matches!(err, RagError::EmptyCorpus));
    }

    #[tokio::test]
    async fn test_build_batches_all_chunks() {
        let embedder = MockEmbedder::new(32);
        let chunks: Vec<Chunk> = (0..10)
            .map(|i| chunk(&format!("chunk number {i}"), "doc.txt"))
            .collect();

        let index = VectorIndex::build(chunks.clone(), &embedder, 3).await.unwrap();
        assert_eq!(index.len(), 10);
        assert_eq!(index.chunks(), chunks.as_slice());
        assert_eq!(index.model_name(), "mock");

        let query = embedder.embed("chunk number 7").await.unwrap();
        let results = index.search(&query, 1);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        let best = embedder.embed(&results[0].chunk.text).await.unwrap();
        assert_eq!(best, query);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_search_len_is_min_k_len(
            vectors in proptest::collection::vec(
                proptest::collection::vec(-1.0f32..1.0f32, 4), 1..20),
            query in proptest::collection::vec(-1.0f32..1.0f32, 4),
            k in 0usize..30,
        ) {
            let chunks: Vec<Chunk> = (0..vectors.len())
                .map(|i| chunk(&i.to_string(), "p"))
                .collect();
            let n = chunks.len();
            let index = VectorIndex::from_parts("m".into(), 4, Utc::now(), chunks, vectors).unwrap();

            let results = index.search(&query, k);
            prop_assert_eq!(results.len(), k.min(n));
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
