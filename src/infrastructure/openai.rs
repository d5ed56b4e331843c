use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::api_error::ApiError;
use super::sse;
use crate::config::ApiConfig;
use crate::domain::chat::{ChatMessage, ChatRequest, ChatStream};
use crate::domain::llm_provider::LlmProvider;
use crate::domain::vector_store::{
    FileCounts, RemoteFile, ScoredChunk, SearchQuery, VectorStore, VectorStoreStatus,
};

const FILE_PURPOSE: &str = "assistants";

mod wire {
    use super::*;

    #[derive(Deserialize)]
    pub struct FileObject {
        pub id: String,
        #[serde(default)]
        pub filename: String,
        #[serde(default)]
        pub bytes: u64,
    }

    #[derive(Serialize)]
    pub struct CreateVectorStore<'a> {
        pub name: &'a str,
        pub file_ids: &'a [String],
    }

    #[derive(Deserialize)]
    pub struct VectorStoreObject {
        pub id: String,
        #[serde(default)]
        pub name: Option<String>,
        pub status: String,
        #[serde(default)]
        pub file_counts: FileCounts,
    }

    #[derive(Serialize)]
    pub struct SearchRequest<'a> {
        pub query: &'a str,
        pub max_num_results: usize,
    }

    #[derive(Deserialize)]
    pub struct SearchPage {
        #[serde(default)]
        pub data: Vec<SearchHit>,
    }

    #[derive(Deserialize)]
    pub struct SearchHit {
        pub file_id: String,
        #[serde(default)]
        pub filename: String,
        pub score: f32,
        #[serde(default)]
        pub content: Vec<ContentPart>,
    }

    #[derive(Deserialize)]
    pub struct ContentPart {
        #[serde(rename = "type")]
        pub kind: String,
        #[serde(default)]
        pub text: String,
    }

    #[derive(Serialize)]
    pub struct ChatCompletionRequest<'a> {
        pub model: &'a str,
        pub messages: &'a [ChatMessage],
        pub stream: bool,
    }
}

impl From<wire::VectorStoreObject> for VectorStore {
    fn from(raw: wire::VectorStoreObject) -> Self {
        VectorStore {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            status: VectorStoreStatus::parse(&raw.status),
            file_counts: raw.file_counts,
        }
    }
}

impl From<wire::SearchHit> for ScoredChunk {
    fn from(hit: wire::SearchHit) -> Self {
        let text = hit
            .content
            .into_iter()
            .filter(|part| part.kind == "text")
            .map(|part| part.text)
            .collect::<Vec<_>>()
            .join("\n");
        ScoredChunk { file_id: hit.file_id, filename: hit.filename, score: hit.score, text }
    }
}

/// REST client for the OpenAI files, vector stores and chat completions APIs.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    /// Creates a client against `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    /// Builds a client from configuration, reading the secret from the
    /// configured environment variable.
    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(&api.base_url, api.api_key()?, api.request_timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Sends the request and returns the response if its status is a success.
    /// Transport failures stay plain `anyhow` errors; HTTP error statuses
    /// become [`ApiError`].
    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to reach the API for {what}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    log::warn!("Failed to read {} error body: {}", what, e);
                    String::new()
                }
            };
            log::warn!("{} failed with {}: {}", what, status, body);
            return Err(ApiError::from_response(status, &body).into());
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = self.send(request, what).await?;
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {what} response body"))?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Format(format!("Unexpected {what} response: {e}")).into())
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn upload_file(&self, path: &Path) -> Result<RemoteFile> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read document {:?}", path))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        log::info!("Uploading {:?} ({} bytes)", path, data.len());

        let form = Form::new()
            .text("purpose", FILE_PURPOSE)
            .part("file", Part::bytes(data).file_name(filename));
        let file: wire::FileObject = self
            .send_json(self.http.post(self.url("files")).multipart(form), "file upload")
            .await?;

        log::debug!("Uploaded {:?} as {}", path, file.id);
        Ok(RemoteFile { id: file.id, filename: file.filename, bytes: file.bytes })
    }

    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<VectorStore> {
        log::info!("Creating vector store '{}' over {} files", name, file_ids.len());
        let body = wire::CreateVectorStore { name, file_ids };
        let store: wire::VectorStoreObject = self
            .send_json(self.http.post(self.url("vector_stores")).json(&body), "vector store creation")
            .await?;
        Ok(store.into())
    }

    async fn get_vector_store(&self, store_id: &str) -> Result<VectorStore> {
        let store: wire::VectorStoreObject = self
            .send_json(
                self.http.get(self.url(&format!("vector_stores/{store_id}"))),
                "vector store status",
            )
            .await?;
        Ok(store.into())
    }

    async fn search_vector_store(&self, store_id: &str, query: &SearchQuery) -> Result<Vec<ScoredChunk>> {
        log::debug!("Searching vector store {} for {:?}", store_id, query.text);
        let body = wire::SearchRequest { query: &query.text, max_num_results: query.max_results };
        let page: wire::SearchPage = self
            .send_json(
                self.http.post(self.url(&format!("vector_stores/{store_id}/search"))).json(&body),
                "vector store search",
            )
            .await?;
        Ok(page.data.into_iter().map(ScoredChunk::from).collect())
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream> {
        let body = wire::ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            stream: true,
        };
        let response = self
            .send(self.http.post(self.url("chat/completions")).json(&body), "chat completion")
            .await?;
        Ok(Box::pin(sse::content_deltas(response.bytes_stream())))
    }
}
