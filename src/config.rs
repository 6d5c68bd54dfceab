use crate::document::AddressingMethod;
use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Configuration was already installed for this process.
    #[error("Configuration already initialized")]
    AlreadyInitialized,
}

/// Runtime configuration for ingestion, querying and the HTTP surface.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding article chunks.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime used for embeddings and answers.
    pub ollama_url: String,
    /// Completion model used to answer questions; `None` disables answers.
    pub chat_model: Option<String>,
    /// Byte threshold used when merging raw chunks.
    pub chunk_max_size: NonZeroUsize,
    /// Addressing convention used to derive article links.
    pub addressing_method: AddressingMethod,
    /// Prefix prepended to every derived link.
    pub link_base_url: String,
    /// Tag name wrapping each retrieved excerpt in the prompt.
    pub content_separator: String,
    /// Optional prompt template file; the built-in template is used otherwise.
    pub prompt_template_path: Option<PathBuf>,
    /// Number of chunks retrieved per question.
    pub query_limit: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic offline hashing, useful for dry runs and tests.
    Hash,
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

const DEFAULT_COLLECTION: &str = "knowledge-base";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_CONTENT_SEPARATOR: &str = "document";
const DEFAULT_QUERY_LIMIT: usize = 5;

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, validating every value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
        };
        let optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Ok(Self {
            qdrant_url: required("QDRANT_URL")?,
            qdrant_collection_name: optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            qdrant_api_key: optional("QDRANT_API_KEY"),
            embedding_provider: required("EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: required("EMBEDDING_MODEL")?,
            embedding_dimension: required("EMBEDDING_DIMENSION")?
                .parse::<usize>()
                .ok()
                .filter(|dimension| *dimension > 0)
                .ok_or_else(|| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))?,
            ollama_url: optional("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            chat_model: optional("CHAT_MODEL"),
            chunk_max_size: optional("CHUNK_MAX_SIZE")
                .map(|value| {
                    value
                        .parse::<NonZeroUsize>()
                        .map_err(|_| ConfigError::InvalidValue("CHUNK_MAX_SIZE".into()))
                })
                .transpose()?
                .unwrap_or(crate::chunking::DEFAULT_CHUNK_MAX_SIZE),
            addressing_method: optional("ADDRESSING_METHOD")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("ADDRESSING_METHOD".into()))
                })
                .transpose()?
                .unwrap_or_default(),
            link_base_url: optional("LINK_BASE_URL").unwrap_or_default(),
            content_separator: optional("CONTENT_SEPARATOR")
                .unwrap_or_else(|| DEFAULT_CONTENT_SEPARATOR.to_string()),
            prompt_template_path: optional("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            query_limit: optional("QUERY_LIMIT")
                .map(|value| {
                    value
                        .parse::<usize>()
                        .ok()
                        .filter(|limit| *limit > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("QUERY_LIMIT".into()))
                })
                .transpose()?
                .unwrap_or(DEFAULT_QUERY_LIMIT),
            server_port: optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, if [`init_config`] has run.
pub fn get_config() -> Option<&'static Config> {
    CONFIG.get()
}

/// Load configuration from `.env` and the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        chunk_max_size = config.chunk_max_size.get(),
        addressing_method = ?config.addressing_method,
        chat_enabled = config.chat_model.is_some(),
        "Loaded configuration"
    );
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)?;
    CONFIG.get().ok_or(ConfigError::AlreadyInitialized)
}
