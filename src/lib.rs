//! # folio-rag: personal knowledge-base assistant
//!
//! Retrieval-augmented answering over a small corpus of text, Markdown and
//! PDF files: the corpus is chunked, embedded and persisted as a SQLite +
//! sqlite-vec artifact, and each question is answered by a generative model
//! conditioned on the closest chunks.
//!
//! ## Architecture
//!
//! - **[`config`]**: JSON configuration with environment overrides
//! - **[`error`]**: Error taxonomy shared by every stage
//! - **[`indexer`]**: Corpus loading and overlapping chunking
//! - **[`embedder`]**: Text embedding (OpenAI-compatible API, deterministic mock)
//! - **[`index`]**: In-memory cosine search and the persisted index artifact
//! - **[`retriever`]**: Top-K retrieval for a question
//! - **[`generator`]**: Persona prompt and answer synthesis
//! - **[`session`]**: Lifecycle façade exposing `answer`
//! - **[`server`]**: HTTP API (axum)
//! - **[`mcp`]**: MCP stdio server with an `ask` tool

pub mod config;
pub mod embedder;
pub mod error;
pub mod generator;
pub mod index;
pub mod indexer;
pub mod mcp;
pub mod retriever;
pub mod server;
pub mod session;

pub use error::{RagError, Result};
pub use index::models::ChatAnswer;
pub use session::{RagSession, SessionStatus};
