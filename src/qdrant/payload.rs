//! Helpers for constructing, decoding and hashing Qdrant payloads.

use crate::qdrant::types::ChunkPayload;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(payload: &ChunkPayload, timestamp_rfc3339: &str) -> Value {
    let mut object = Map::new();
    object.insert("text".into(), Value::String(payload.text.clone()));
    object.insert("context".into(), Value::String(payload.context.clone()));
    object.insert("chunk_hash".into(), Value::String(payload.chunk_hash.clone()));
    object.insert(
        "indexed_at".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );

    if !payload.title.is_empty() {
        object.insert("title".into(), Value::String(payload.title.clone()));
    }
    if !payload.link.is_empty() {
        object.insert("link".into(), Value::String(payload.link.clone()));
    }

    Value::Object(object)
}

/// Decode a stored payload, tolerating missing or mistyped fields.
pub(crate) fn decode_payload(payload: Option<Map<String, Value>>) -> ChunkPayload {
    let Some(map) = payload else {
        return ChunkPayload::default();
    };
    serde_json::from_value(Value::Object(map)).unwrap_or_else(|error| {
        tracing::warn!(error = %error, "Stored payload did not decode; using empty fields");
        ChunkPayload::default()
    })
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
