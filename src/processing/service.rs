//! Ingestion and query service coordinating chunking, embedding, storage and answering.

use crate::{
    chat::{ChatClient, get_chat_client},
    chunking::{Chunk, chunk_markdown},
    config::Config,
    document::{AddressingMethod, Metadata, parse_metadata, path_to_link},
    embedding::{EmbeddingClient, get_embedding_client},
    metrics::{IngestMetrics, MetricsSnapshot},
    processing::{
        ids::ChunkIdCounter,
        prompt::PromptTemplate,
        types::{
            FileFilter, IngestReport, ProcessingError, ProcessingOutcome, QueryError,
            QueryResponse, RagDocument, ServiceInitError,
        },
    },
    qdrant::{ChunkPayload, ChunkRecord, QdrantService, VectorStore, compute_chunk_hash},
};
use async_trait::async_trait;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use walkdir::WalkDir;

/// Knobs that shape how documents turn into stored chunks.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Compressor threshold in bytes.
    pub chunk_max_size: NonZeroUsize,
    /// Addressing convention for links.
    pub addressing_method: AddressingMethod,
    /// Prefix prepended to every derived link.
    pub link_base_url: String,
    /// Chunks retrieved per question.
    pub query_limit: usize,
}

impl IngestSettings {
    /// Extract ingestion settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_max_size: config.chunk_max_size,
            addressing_method: config.addressing_method,
            link_base_url: config.link_base_url.clone(),
            query_limit: config.query_limit,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            chunk_max_size: crate::chunking::DEFAULT_CHUNK_MAX_SIZE,
            addressing_method: AddressingMethod::default(),
            link_base_url: String::new(),
            query_limit: 5,
        }
    }
}

/// A document chunked and annotated, ready for embedding.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Source path.
    pub path: PathBuf,
    /// Windowed chunks in reading order.
    pub chunks: Vec<Chunk>,
    /// Front matter; empty when it could not be read.
    pub metadata: Metadata,
    /// Absolute link; empty when it could not be derived.
    pub link: String,
}

/// Read and chunk a document without touching any external service.
///
/// Metadata and link failures are logged and leave the corresponding field empty.
pub fn prepare_document(
    path: &Path,
    settings: &IngestSettings,
) -> Result<PreparedDocument, ProcessingError> {
    let source = std::fs::read_to_string(path).map_err(|source| ProcessingError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let chunks = chunk_markdown(&source, settings.chunk_max_size);

    let metadata = parse_metadata(&source).unwrap_or_else(|error| {
        tracing::warn!(path = %path.display(), error = %error, "Metadata extraction problem");
        Metadata::default()
    });

    let link = match path_to_link(
        &path.to_string_lossy(),
        settings.addressing_method,
        &metadata.date,
    ) {
        Ok(relative) => format!("{}{relative}", settings.link_base_url),
        Err(error) => {
            tracing::warn!(path = %path.display(), error = %error, "Link derivation failed");
            String::new()
        }
    };

    Ok(PreparedDocument {
        path: path.to_path_buf(),
        chunks,
        metadata,
        link,
    })
}

/// Abstraction over the query path used by the HTTP surface.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Retrieve the chunks nearest to `question` and answer it when a model is configured.
    async fn ask(&self, question: &str) -> Result<QueryResponse, QueryError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates ingestion (chunk, embed, store) and question answering (embed, query, complete).
///
/// Construct it once near process start and share it through an `Arc`.
pub struct IngestService {
    embedding_client: Box<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    chat_client: Option<Box<dyn ChatClient>>,
    prompt: PromptTemplate,
    settings: IngestSettings,
    metrics: Arc<IngestMetrics>,
    collection_ready: OnceCell<()>,
}

impl IngestService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        embedding_client: Box<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        chat_client: Option<Box<dyn ChatClient>>,
        prompt: PromptTemplate,
        settings: IngestSettings,
    ) -> Self {
        Self {
            embedding_client,
            store,
            chat_client,
            prompt,
            settings,
            metrics: Arc::new(IngestMetrics::new()),
            collection_ready: OnceCell::new(),
        }
    }

    /// Build the service with the Qdrant and Ollama adapters named by `config`.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!(provider = ?config.embedding_provider, "Initializing embedding client");
        let embedding_client = get_embedding_client(config)?;
        let chat_client = get_chat_client(config)?;
        let store: Arc<dyn VectorStore> = Arc::new(QdrantService::from_config(config)?);
        let prompt = match &config.prompt_template_path {
            Some(path) => PromptTemplate::from_file(path, config.content_separator.clone())
                .map_err(|source| ServiceInitError::PromptTemplate {
                    path: path.clone(),
                    source,
                })?,
            None => PromptTemplate::new(config.content_separator.clone()),
        };

        Ok(Self::new(
            embedding_client,
            store,
            chat_client,
            prompt,
            IngestSettings::from_config(config),
        ))
    }

    /// Settings in effect for this service.
    pub fn settings(&self) -> &IngestSettings {
        &self.settings
    }

    /// Chunk, embed and store one document, drawing ids from `counter`.
    pub async fn process_document(
        &self,
        path: &Path,
        counter: &mut ChunkIdCounter,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        tracing::info!(path = %path.display(), "Processing document");
        self.ensure_collection().await?;

        let PreparedDocument {
            path,
            chunks,
            metadata,
            link,
        } = prepare_document(path, &self.settings)?;

        if chunks.is_empty() {
            tracing::info!(path = %path.display(), "Document produced no chunks");
            self.metrics.record_document(0);
            return Ok(ProcessingOutcome {
                path,
                chunk_count: 0,
                first_id: None,
                title: metadata.title,
                link,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedding_client.generate_embeddings(texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(ProcessingError::EmbeddingCount {
                expected: chunks.len(),
                actual: embeddings.len(),
            });
        }

        let records: Vec<ChunkRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| {
                let id = counter.next_id();
                tracing::debug!(id, link = %link, title = %metadata.title, "Adding chunk");
                ChunkRecord {
                    id,
                    vector,
                    payload: ChunkPayload {
                        chunk_hash: compute_chunk_hash(&chunk.text),
                        text: chunk.text,
                        context: chunk.context,
                        title: metadata.title.clone(),
                        link: link.clone(),
                    },
                }
            })
            .collect();
        let first_id = records.first().map(|record| record.id);

        let chunk_count = self.store.put(records).await?;
        self.metrics.record_document(chunk_count as u64);
        tracing::info!(
            path = %path.display(),
            chunks = chunk_count,
            first_id,
            link = %link,
            "Document indexed"
        );

        Ok(ProcessingOutcome {
            path,
            chunk_count,
            first_id,
            title: metadata.title,
            link,
        })
    }

    /// Ingest every matching file below `root` in path order.
    ///
    /// Failures of individual documents are logged, counted and skipped. Only an unreadable
    /// root or an unavailable vector store aborts the run.
    pub async fn ingest_directory(
        &self,
        root: &Path,
        filter: FileFilter,
        counter: &mut ChunkIdCounter,
    ) -> Result<IngestReport, ProcessingError> {
        tracing::info!(root = %root.display(), filter = ?filter, "Starting ingestion run");
        self.ensure_collection().await?;

        let mut report = IngestReport::default();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) if source.depth() == 0 => {
                    return Err(ProcessingError::Walk {
                        root: root.to_path_buf(),
                        source,
                    });
                }
                Err(error) => {
                    tracing::warn!(error = %error, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !filter.matches(entry.path()) {
                continue;
            }

            match self.process_document(entry.path(), counter).await {
                Ok(outcome) => {
                    report.documents_indexed += 1;
                    report.chunks_indexed += outcome.chunk_count;
                }
                Err(error) => {
                    tracing::error!(path = %entry.path().display(), error = %error, "Document failed");
                    self.metrics.record_failure();
                    report.failed.push(entry.into_path());
                }
            }
        }

        report.next_id = counter.peek();
        tracing::info!(
            documents = report.documents_indexed,
            chunks = report.chunks_indexed,
            failed = report.failed.len(),
            next_id = report.next_id,
            "Ingestion run finished"
        );
        Ok(report)
    }

    /// Render the prompt that [`QueryApi::ask`] would send for `question` and `documents`.
    pub fn render_prompt(&self, question: &str, documents: &[RagDocument]) -> String {
        self.prompt.render(
            question,
            documents.iter().map(|document| document.content.as_str()),
        )
    }

    async fn ensure_collection(&self) -> Result<(), ProcessingError> {
        let dimension = self.embedding_client.dimension() as u64;
        self.collection_ready
            .get_or_try_init(|| async {
                tracing::debug!(vector_size = dimension, "Ensuring collection");
                self.store.ensure_collection(dimension).await
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl QueryApi for IngestService {
    async fn ask(&self, question: &str) -> Result<QueryResponse, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }
        tracing::info!(question, "Question received");

        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(QueryError::EmptyEmbedding)?;

        let hits = self.store.query(vector, self.settings.query_limit).await?;
        let documents: Vec<RagDocument> = hits
            .into_iter()
            .map(|hit| RagDocument {
                id: hit.id,
                score: hit.score,
                content: hit.payload.text,
                context: hit.payload.context,
                link: hit.payload.link,
                title: hit.payload.title,
            })
            .collect();
        tracing::debug!(documents = documents.len(), "Retrieved documents");

        let answer = match &self.chat_client {
            Some(chat) => {
                let prompt = self.render_prompt(question, &documents);
                chat.complete(&prompt).await?
            }
            None => {
                tracing::debug!("No chat model configured; returning documents only");
                String::new()
            }
        };

        Ok(QueryResponse { answer, documents })
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatClientError;
    use crate::embedding::HashEmbeddingClient;
    use crate::qdrant::{QdrantError, ScoredChunk};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<ChunkRecord>>,
        ensured: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl VectorStore for MemoryStore {
        async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
            self.ensured.lock().expect("lock").push(vector_size);
            Ok(())
        }

        async fn put(&self, records: Vec<ChunkRecord>) -> Result<usize, QdrantError> {
            let count = records.len();
            self.records.lock().expect("lock").extend(records);
            Ok(count)
        }

        async fn query(
            &self,
            _vector: Vec<f32>,
            limit: usize,
        ) -> Result<Vec<ScoredChunk>, QdrantError> {
            Ok(self
                .records
                .lock()
                .expect("lock")
                .iter()
                .take(limit)
                .map(|record| ScoredChunk {
                    id: record.id.to_string(),
                    score: 0.5,
                    payload: record.payload.clone(),
                })
                .collect())
        }
    }

    struct RecordingChat {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn complete(&self, prompt: &str) -> Result<String, ChatClientError> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            Ok("Use a named profile.".into())
        }
    }

    const ARTICLE: &str = "---\ntitle: Local credentials\ndate: 2024-03-04\n---\n\n## Setup\n\nDo this.\n\nThen that.\n";

    fn write_article(root: &Path, relative: &str, body: &str) -> PathBuf {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("dirs");
        std::fs::write(&path, body).expect("write");
        path
    }

    fn service(store: Arc<MemoryStore>, chat: Option<Box<dyn ChatClient>>) -> IngestService {
        IngestService::new(
            Box::new(HashEmbeddingClient::new(16)),
            store,
            chat,
            PromptTemplate::with_template("{{documents}}Q: {{question}}", "document"),
            IngestSettings {
                link_base_url: "https://example.org/".into(),
                ..IngestSettings::default()
            },
        )
    }

    #[test]
    fn prepare_document_fills_title_and_link() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_article(dir.path(), "content/post/2024/creds/index.md", ARTICLE);

        let prepared = prepare_document(
            &path,
            &IngestSettings {
                link_base_url: "https://example.org/".into(),
                ..IngestSettings::default()
            },
        )
        .expect("prepared");

        assert_eq!(prepared.metadata.title, "Local credentials");
        assert_eq!(prepared.link, "https://example.org/post/2024/creds/");
        assert_eq!(prepared.chunks.len(), 1);
        assert_eq!(prepared.chunks[0].text, "SetupSetup\nDo this.\n\nThen that.\n");
    }

    #[test]
    fn prepare_document_tolerates_missing_metadata_and_marker() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_article(dir.path(), "notes/index.md", "# Notes\n\nBody text.\n");

        let prepared = prepare_document(&path, &IngestSettings::default()).expect("prepared");
        assert!(prepared.metadata.title.is_empty());
        assert!(prepared.link.is_empty());
        assert!(!prepared.chunks.is_empty());
    }

    #[test]
    fn prepare_document_reports_unreadable_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let error = prepare_document(&dir.path().join("missing.md"), &IngestSettings::default())
            .unwrap_err();
        assert!(matches!(error, ProcessingError::Read { .. }));
    }

    #[tokio::test]
    async fn process_document_stores_chunks_with_counter_ids() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_article(dir.path(), "content/post/2024/creds/index.md", ARTICLE);
        let store = Arc::new(MemoryStore::default());
        let service = service(store.clone(), None);
        let mut counter = ChunkIdCounter::starting_at(40);

        let outcome = service
            .process_document(&path, &mut counter)
            .await
            .expect("outcome");

        assert_eq!(outcome.chunk_count, 1);
        assert_eq!(outcome.first_id, Some(40));
        assert_eq!(counter.peek(), 41);

        let records = store.records.lock().expect("lock");
        let record = &records[0];
        assert_eq!(record.id, 40);
        assert_eq!(record.vector.len(), 16);
        assert_eq!(record.payload.title, "Local credentials");
        assert_eq!(record.payload.link, "https://example.org/post/2024/creds/");
        assert_eq!(record.payload.chunk_hash, compute_chunk_hash(&record.payload.text));
        assert_eq!(*store.ensured.lock().expect("lock"), vec![16]);
    }

    #[tokio::test]
    async fn ingest_directory_picks_index_files_in_path_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let content = dir.path().join("content");
        write_article(dir.path(), "content/post/2024/b/index.md", ARTICLE);
        write_article(dir.path(), "content/post/2024/a/index.md", ARTICLE);
        write_article(dir.path(), "content/post/2024/b/notes.md", ARTICLE);

        let store = Arc::new(MemoryStore::default());
        let service = service(store.clone(), None);
        let mut counter = ChunkIdCounter::new();

        let report = service
            .ingest_directory(&content, FileFilter::IndexOnly, &mut counter)
            .await
            .expect("report");

        assert_eq!(report.documents_indexed, 2);
        assert_eq!(report.chunks_indexed, 2);
        assert!(report.failed.is_empty());
        assert_eq!(report.next_id, 2);

        let ids: Vec<u64> = store
            .records
            .lock()
            .expect("lock")
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(
            store.records.lock().expect("lock")[0].payload.link,
            "https://example.org/post/2024/a/"
        );
        assert_eq!(store.ensured.lock().expect("lock").len(), 1);
        assert_eq!(service.metrics_snapshot().documents_indexed, 2);
    }

    #[tokio::test]
    async fn ingest_directory_counts_unreadable_documents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let content = dir.path().join("content");
        write_article(dir.path(), "content/post/2024/a/index.md", ARTICLE);
        let broken = content.join("post/2024/z/index.md");
        std::fs::create_dir_all(broken.parent().expect("parent")).expect("dirs");
        std::fs::write(&broken, [0xff_u8, 0xfe, 0x00]).expect("write");

        let service = service(Arc::new(MemoryStore::default()), None);
        let mut counter = ChunkIdCounter::new();
        let report = service
            .ingest_directory(&content, FileFilter::IndexOnly, &mut counter)
            .await
            .expect("report");

        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.failed, vec![broken]);
        assert_eq!(service.metrics_snapshot().documents_failed, 1);
    }

    #[tokio::test]
    async fn ingest_directory_rejects_missing_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        let service = service(Arc::new(MemoryStore::default()), None);
        let error = service
            .ingest_directory(
                &dir.path().join("absent"),
                FileFilter::AnyMarkdown,
                &mut ChunkIdCounter::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, ProcessingError::Walk { .. }));
    }

    #[tokio::test]
    async fn ask_renders_prompt_and_returns_documents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_article(dir.path(), "content/post/2024/creds/index.md", ARTICLE);
        let store = Arc::new(MemoryStore::default());
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let chat = RecordingChat {
            prompts: prompts.clone(),
        };
        let service = service(store, Some(Box::new(chat)));
        service
            .process_document(&path, &mut ChunkIdCounter::new())
            .await
            .expect("indexed");

        let response = service.ask("  How do I set up?  ").await.expect("response");

        assert_eq!(response.answer, "Use a named profile.");
        assert_eq!(response.documents.len(), 1);
        let document = &response.documents[0];
        assert_eq!(document.id, "0");
        assert_eq!(document.link, "https://example.org/post/2024/creds/");
        assert_eq!(document.content, "SetupSetup\nDo this.\n\nThen that.\n");

        let prompts = prompts.lock().expect("lock");
        assert_eq!(
            prompts[0],
            "<document>\nSetupSetup\nDo this.\n\nThen that.\n\n</document>\nQ: How do I set up?"
        );
    }

    #[tokio::test]
    async fn ask_without_chat_model_returns_empty_answer() {
        let service = service(Arc::new(MemoryStore::default()), None);
        let response = service.ask("anything").await.expect("response");
        assert!(response.answer.is_empty());
        assert!(response.documents.is_empty());
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let service = service(Arc::new(MemoryStore::default()), None);
        assert!(matches!(
            service.ask("   ").await,
            Err(QueryError::EmptyQuestion)
        ));
    }
}
