use serde::{Deserialize, Serialize};

/// One ingested file. `provenance` is the file's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub text: String,
    pub provenance: String,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>, provenance: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provenance: provenance.into(),
        }
    }
}

/// A bounded window of a [`SourceDocument`], the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub provenance: String,
}

/// A chunk returned by a similarity search together with its cosine score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Best match first, at most `k` entries.
pub type RetrievalResult = Vec<RetrievedChunk>;

/// The structured result of one `answer` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub question: String,
    pub answer: String,
    /// Provenance of the retrieved chunks, deduplicated by first occurrence.
    pub sources: Vec<String>,
}
