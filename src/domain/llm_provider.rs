use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::domain::chat::{ChatRequest, ChatStream};
use crate::domain::vector_store::{RemoteFile, ScoredChunk, SearchQuery, VectorStore};

/// The hosted service that stores files, indexes them and answers chats.
///
/// Errors reported by the service itself surface as
/// [`ApiError`](crate::infrastructure::api_error::ApiError) inside the
/// returned `anyhow::Error`; anything else (transport, local I/O) does not.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Uploads a local file and returns its remote handle.
    async fn upload_file(&self, path: &Path) -> Result<RemoteFile>;

    /// Creates a vector store over already uploaded files.
    async fn create_vector_store(&self, name: &str, file_ids: &[String]) -> Result<VectorStore>;

    /// Re-fetches a vector store to observe its current status.
    async fn get_vector_store(&self, store_id: &str) -> Result<VectorStore>;

    /// Semantic search. Results come back ordered by the service's ranking.
    async fn search_vector_store(&self, store_id: &str, query: &SearchQuery) -> Result<Vec<ScoredChunk>>;

    /// Starts a streamed chat completion.
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ChatStream>;
}
