//! Document processing pipeline: chunking, embedding, Qdrant writes and question answering.

mod ids;
mod prompt;
mod service;
pub mod types;

pub use ids::ChunkIdCounter;
pub use prompt::PromptTemplate;
pub use service::{IngestService, IngestSettings, PreparedDocument, QueryApi, prepare_document};
pub use types::{
    FileFilter, IngestReport, ProcessingError, ProcessingOutcome, QueryError, QueryResponse,
    RagDocument, ServiceInitError,
};
