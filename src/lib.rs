#![deny(missing_docs)]

//! Core library for hugo-rag: chunk Hugo articles, index them in Qdrant and answer questions
//! from the retrieved chunks.

/// HTTP routing and REST handlers.
pub mod api;
/// Completion client abstraction and adapters.
pub mod chat;
/// Markdown chunk extraction, compression and windowing.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Front matter and link derivation for source documents.
pub mod document;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Typed markdown node tree and its parser adapter.
pub mod markdown;
/// Ingestion metrics helpers.
pub mod metrics;
/// Document ingestion and question answering pipeline.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
