//! Core data types and error definitions for the processing pipeline.

use crate::{chat::ChatClientError, embedding::EmbeddingClientError, qdrant::QdrantError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors emitted while ingesting a document or a content tree.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The markdown source could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        /// Document path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Walking the content tree failed before any document was processed.
    #[error("Failed to walk {}: {source}", .root.display())]
    Walk {
        /// Root directory of the walk.
        root: PathBuf,
        /// Underlying walkdir error.
        #[source]
        source: walkdir::Error,
    },
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned a different number of vectors than chunks.
    #[error("Expected {expected} embeddings, received {actual}")]
    EmbeddingCount {
        /// Number of chunks sent.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// Vector store rejected a write.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
}

/// Errors raised while assembling the service from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Embedding client could not be built.
    #[error("Failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Chat client could not be built.
    #[error("Failed to initialize chat client: {0}")]
    Chat(#[from] ChatClientError),
    /// Qdrant client could not be built.
    #[error("Failed to initialize Qdrant client: {0}")]
    Qdrant(#[from] QdrantError),
    /// Prompt template file could not be read.
    #[error("Failed to read prompt template {}: {source}", .path.display())]
    PromptTemplate {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Question was empty after trimming.
    #[error("Question must not be empty")]
    EmptyQuestion,
    /// Embedding provider failed to return a vector for the question.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the question")]
    EmptyEmbedding,
    /// Similarity query failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Completion model failed to answer.
    #[error("Failed to generate answer: {0}")]
    Chat(#[from] ChatClientError),
}

/// Summary of one indexed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutcome {
    /// Path of the processed document.
    pub path: PathBuf,
    /// Number of chunks stored.
    pub chunk_count: usize,
    /// First chunk id issued, when any chunk was stored.
    pub first_id: Option<u64>,
    /// Title read from front matter; empty when metadata was unavailable.
    pub title: String,
    /// Link stored with every chunk; empty when it could not be derived.
    pub link: String,
}

/// Totals for a directory ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents indexed successfully.
    pub documents_indexed: usize,
    /// Chunks stored across all documents.
    pub chunks_indexed: usize,
    /// Documents that failed and were skipped.
    pub failed: Vec<PathBuf>,
    /// Next id the counter would issue.
    pub next_id: u64,
}

/// Which files a directory ingestion picks up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileFilter {
    /// Only page-bundle `index.md` files.
    #[default]
    IndexOnly,
    /// Every file with an `.md` extension.
    AnyMarkdown,
}

impl FileFilter {
    /// Whether `path` should be ingested.
    pub fn matches(self, path: &std::path::Path) -> bool {
        match self {
            Self::IndexOnly => path.file_name().is_some_and(|name| name == "index.md"),
            Self::AnyMarkdown => path
                .extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("md")),
        }
    }
}

/// Retrieved chunk returned to question askers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagDocument {
    /// Point id in the vector store.
    pub id: String,
    /// Similarity score.
    pub score: f32,
    /// Chunk text.
    pub content: String,
    /// Windowed context stored with the chunk.
    pub context: String,
    /// Published link of the source article.
    pub link: String,
    /// Source article title.
    pub title: String,
}

/// Answer plus the documents it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Model answer; empty when no completion model is configured.
    pub answer: String,
    /// Retrieved documents, best match first.
    pub documents: Vec<RagDocument>,
}
