//! MCP stdio surface over the RAG session.
pub mod server;
pub mod tools;
