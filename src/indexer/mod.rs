//! Corpus ingestion: directory loading and chunking.
pub mod chunker;
pub mod loader;
#[cfg(feature = "pdf")]
pub mod pdf;
