//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A downloaded snapshot could not be written locally.
    #[error("Failed to write snapshot {path}: {source}")]
    SnapshotWrite {
        /// Destination file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A local snapshot file could not be read for upload.
    #[error("Failed to read snapshot {path}: {source}")]
    SnapshotRead {
        /// Source file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Payload stored next to every chunk vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkPayload {
    /// Chunk text that was embedded.
    pub text: String,
    /// Windowed context returned to readers.
    pub context: String,
    /// Title of the source article.
    pub title: String,
    /// Published link of the source article.
    pub link: String,
    /// SHA-256 of `text`.
    pub chunk_hash: String,
}

/// Point ready for upsert.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Integer point id issued by the ingestion counter.
    pub id: u64,
    /// Embedding of `payload.text`.
    pub vector: Vec<f32>,
    /// Stored metadata.
    pub payload: ChunkPayload,
}

/// Scored chunk returned by a similarity query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Point identifier rendered as text.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Decoded payload; fields missing in storage come back empty.
    pub payload: ChunkPayload,
}

/// Snapshot created on the server and copied to local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotExport {
    /// Server-side snapshot name.
    pub name: String,
    /// Bytes written to the local file.
    pub bytes: u64,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct SnapshotResponse {
    pub(crate) result: SnapshotDescription,
}

#[derive(Deserialize)]
pub(crate) struct SnapshotDescription {
    pub(crate) name: String,
}
