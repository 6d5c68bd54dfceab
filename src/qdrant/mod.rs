//! Qdrant vector store integration.

use async_trait::async_trait;

pub mod client;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use payload::compute_chunk_hash;
pub use types::{ChunkPayload, ChunkRecord, QdrantError, ScoredChunk, SnapshotExport};

/// Storage seam used by the ingestion and query paths.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Make sure the backing collection exists for vectors of `vector_size`.
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError>;

    /// Store `records`, replacing points that already use the same ids.
    async fn put(&self, records: Vec<ChunkRecord>) -> Result<usize, QdrantError>;

    /// Return up to `limit` chunks nearest to `vector`, best first.
    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>, QdrantError>;
}
