//! HTTP client wrapper for interacting with Qdrant.

use crate::config::Config;
use crate::qdrant::VectorStore;
use crate::qdrant::{
    payload::{build_payload, current_timestamp_rfc3339, decode_payload},
    types::{
        ChunkRecord, QdrantError, QueryResponse, QueryResponseResult, ScoredChunk, SnapshotExport,
        SnapshotResponse,
    },
};
use async_trait::async_trait;
use reqwest::{
    Client, Method, StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};
use std::path::Path;

/// Lightweight HTTP client for one Qdrant collection.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) collection: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a client for `collection` on the instance at `base_url`.
    pub fn new(
        base_url: &str,
        collection: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("hugo-rag/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(QdrantError::InvalidUrl)?;
        let collection = collection.into();
        tracing::debug!(
            url = %base_url,
            collection = %collection,
            has_api_key = api_key.as_deref().is_some_and(|value| !value.is_empty()),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            collection,
            api_key,
        })
    }

    /// Construct a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        Self::new(
            &config.qdrant_url,
            config.qdrant_collection_name.clone(),
            config.qdrant_api_key.clone(),
        )
    }

    /// Name of the collection this client writes to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Create the collection with cosine distance when it does not exist yet.
    pub async fn create_collection_if_not_exists(&self, vector_size: u64) -> Result<(), QdrantError> {
        if self.collection_exists().await? {
            tracing::debug!(collection = %self.collection, "Collection already present");
            return Ok(());
        }

        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{}", self.collection))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(collection = %self.collection, vector_size, "Collection created");
        })
        .await
    }

    /// Upsert points with integer ids, waiting until they are persisted.
    pub async fn upsert_points(&self, records: Vec<ChunkRecord>) -> Result<usize, QdrantError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let serialized: Vec<_> = records
            .into_iter()
            .map(|record| {
                json!({
                    "id": record.id,
                    "vector": record.vector,
                    "payload": build_payload(&record.payload, &now),
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.collection),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = %self.collection,
                points = point_count,
                "Points upserted"
            );
        })
        .await?;

        Ok(point_count)
    }

    /// Return the `limit` nearest chunks to `vector` with their payloads.
    pub async fn search_points(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, QdrantError> {
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        Ok(points
            .into_iter()
            .map(|point| ScoredChunk {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: decode_payload(point.payload),
            })
            .collect())
    }

    /// Create a snapshot of the collection and download it to `destination`.
    pub async fn export_snapshot(&self, destination: &Path) -> Result<SnapshotExport, QdrantError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/snapshots", self.collection),
            )?
            .query(&[("wait", true)])
            .send()
            .await?;
        let response = self.check_status(response, "Snapshot creation failed").await?;
        let SnapshotResponse { result } = response.json().await?;

        let download = self
            .request(
                Method::GET,
                &format!("collections/{}/snapshots/{}", self.collection, result.name),
            )?
            .send()
            .await?;
        let download = self.check_status(download, "Snapshot download failed").await?;
        let bytes = download.bytes().await?;

        tokio::fs::write(destination, &bytes)
            .await
            .map_err(|source| QdrantError::SnapshotWrite {
                path: destination.display().to_string(),
                source,
            })?;

        tracing::info!(
            collection = %self.collection,
            snapshot = %result.name,
            bytes = bytes.len(),
            destination = %destination.display(),
            "Snapshot exported"
        );
        Ok(SnapshotExport {
            name: result.name,
            bytes: bytes.len() as u64,
        })
    }

    /// Restore the collection from a snapshot.
    ///
    /// `http(s)://` and `file://` locations are resolved by the Qdrant server itself. Anything
    /// else is a path on this machine, such as a file written by [`Self::export_snapshot`], and
    /// is uploaded.
    pub async fn import_snapshot(&self, location: &str) -> Result<(), QdrantError> {
        if is_server_location(location) {
            self.recover_snapshot(location).await
        } else {
            self.upload_snapshot(Path::new(location)).await
        }
    }

    async fn recover_snapshot(&self, location: &str) -> Result<(), QdrantError> {
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/snapshots/recover", self.collection),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "location": location }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(collection = %self.collection, location, "Snapshot recovered");
        })
        .await
    }

    async fn upload_snapshot(&self, source: &Path) -> Result<(), QdrantError> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|err| QdrantError::SnapshotRead {
                path: source.display().to_string(),
                source: err,
            })?;
        let size = bytes.len();
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.snapshot", self.collection));
        let form = Form::new().part("snapshot", Part::bytes(bytes).file_name(file_name));

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/snapshots/upload", self.collection),
            )?
            .query(&[("wait", true)])
            .multipart(form)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(
                collection = %self.collection,
                source = %source.display(),
                bytes = size,
                "Snapshot uploaded"
            );
        })
        .await
    }

    async fn collection_exists(&self) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
        context: &'static str,
    ) -> Result<reqwest::Response, QdrantError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = QdrantError::UnexpectedStatus { status, body };
        tracing::error!(collection = %self.collection, error = %error, "{context}");
        Err(error)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        self.check_status(response, "Qdrant request failed").await?;
        on_success();
        Ok(())
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), QdrantError> {
        self.create_collection_if_not_exists(vector_size).await
    }

    async fn put(&self, records: Vec<ChunkRecord>) -> Result<usize, QdrantError> {
        self.upsert_points(records).await
    }

    async fn query(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>, QdrantError> {
        self.search_points(vector, limit).await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn is_server_location(location: &str) -> bool {
    ["http://", "https://", "file://"]
        .iter()
        .any(|scheme| location.starts_with(scheme))
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::ChunkPayload;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };

    fn service(server: &MockServer, api_key: Option<&str>) -> QdrantService {
        QdrantService::new(&server.base_url(), "knowledge-base", api_key.map(String::from))
            .expect("client")
    }

    #[tokio::test]
    async fn search_points_decodes_payloads() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/knowledge-base/points/query")
                    .json_body_partial(r#"{ "limit": 5, "with_payload": true }"#);
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": 17,
                                "score": 0.42,
                                "payload": {
                                    "text": "Setup\nDo this.\n",
                                    "context": "ctx",
                                    "link": "post/2024/creds/"
                                }
                            }
                        ]
                    }
                }));
            })
            .await;

        let results = service(&server, None)
            .search_points(vec![0.1, 0.2], 5)
            .await
            .expect("search request");

        mock.assert();
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "17");
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        assert_eq!(hit.payload.text, "Setup\nDo this.\n");
        assert_eq!(hit.payload.link, "post/2024/creds/");
        assert!(hit.payload.title.is_empty());
    }

    #[tokio::test]
    async fn upsert_sends_integer_ids_and_api_key() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/knowledge-base/points")
                    .query_param("wait", "true")
                    .header("api-key", "secret")
                    .json_body_partial(r#"{ "points": [ { "id": 7, "payload": { "text": "a" } } ] }"#);
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        let stored = service(&server, Some("secret"))
            .upsert_points(vec![ChunkRecord {
                id: 7,
                vector: vec![1.0, 0.0],
                payload: ChunkPayload {
                    text: "a".into(),
                    ..ChunkPayload::default()
                },
            }])
            .await
            .expect("upsert");

        mock.assert();
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn empty_upsert_skips_request() {
        let server = MockServer::start_async().await;
        let stored = service(&server, None)
            .upsert_points(Vec::new())
            .await
            .expect("upsert");
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn collection_is_created_only_when_missing() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/knowledge-base");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/knowledge-base")
                    .json_body(json!({ "vectors": { "size": 3, "distance": "Cosine" } }));
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        service(&server, None)
            .create_collection_if_not_exists(3)
            .await
            .expect("ensure collection");

        exists.assert();
        create.assert();
    }

    #[tokio::test]
    async fn existing_collection_is_left_alone() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/knowledge-base");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/knowledge-base");
                then.status(200);
            })
            .await;

        service(&server, None)
            .create_collection_if_not_exists(3)
            .await
            .expect("ensure collection");
        create.assert_hits(0);
    }

    #[tokio::test]
    async fn export_snapshot_downloads_to_file() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/knowledge-base/snapshots");
                then.status(200).json_body(json!({
                    "result": { "name": "kb-1.snapshot", "size": 4 }
                }));
            })
            .await;
        let download = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/collections/knowledge-base/snapshots/kb-1.snapshot");
                then.status(200).body("SNAP");
            })
            .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let destination = dir.path().join("kb.snapshot");
        let export = service(&server, None)
            .export_snapshot(&destination)
            .await
            .expect("export");

        create.assert();
        download.assert();
        assert_eq!(export.name, "kb-1.snapshot");
        assert_eq!(export.bytes, 4);
        assert_eq!(std::fs::read(&destination).expect("file"), b"SNAP");
    }

    #[tokio::test]
    async fn import_snapshot_posts_location() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/knowledge-base/snapshots/recover")
                    .json_body(json!({ "location": "file:///snapshots/kb.snapshot" }));
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;

        service(&server, None)
            .import_snapshot("file:///snapshots/kb.snapshot")
            .await
            .expect("import");
        mock.assert();
    }

    #[tokio::test]
    async fn exported_snapshot_file_is_uploaded_on_import() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/knowledge-base/snapshots");
                then.status(200).json_body(json!({
                    "result": { "name": "kb-2.snapshot", "size": 8 }
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/collections/knowledge-base/snapshots/kb-2.snapshot");
                then.status(200).body("SNAPDATA");
            })
            .await;
        let upload = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/knowledge-base/snapshots/upload")
                    .query_param("wait", "true")
                    .header_exists("content-type")
                    .body_contains("name=\"snapshot\"")
                    .body_contains("filename=\"kb.snapshot\"")
                    .body_contains("SNAPDATA");
                then.status(200).json_body(json!({ "result": true }));
            })
            .await;
        let recover = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/knowledge-base/snapshots/recover");
                then.status(200);
            })
            .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let file = dir.path().join("kb.snapshot");
        let qdrant = service(&server, None);
        qdrant.export_snapshot(&file).await.expect("export");
        qdrant
            .import_snapshot(file.to_str().expect("utf-8 path"))
            .await
            .expect("import");

        upload.assert();
        recover.assert_hits(0);
    }

    #[tokio::test]
    async fn missing_local_snapshot_is_a_read_error() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.snapshot");

        let error = service(&server, None)
            .import_snapshot(missing.to_str().expect("utf-8 path"))
            .await
            .expect_err("missing file");
        assert!(matches!(error, QdrantError::SnapshotRead { .. }));
    }

    #[tokio::test]
    async fn failures_surface_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/knowledge-base/snapshots/recover");
                then.status(400).body("bad location");
            })
            .await;

        let error = service(&server, None)
            .import_snapshot("https://backups.example.org/kb.snapshot")
            .await
            .expect_err("error status");
        assert!(matches!(
            error,
            QdrantError::UnexpectedStatus { status, ref body }
                if status == StatusCode::BAD_REQUEST && body == "bad location"
        ));
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("http://localhost:6333/").as_deref(),
            Ok("http://localhost:6333/")
        );
        assert_eq!(
            format_endpoint("http://localhost:6333/", "/collections/x"),
            "http://localhost:6333/collections/x"
        );
        assert!(normalize_base_url("not a url").is_err());
    }
}
