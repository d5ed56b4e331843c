pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod initialization;

/// Re-export necessary items for main.rs and tests
pub use application::chat_session::{ChatSession, ChatSettings};
pub use application::indexing::{IndexingError, PollPolicy};
pub use application::retrieval::{filter_relevant, Retriever};
pub use config::{load_config, AppConfig};
pub use domain::chat::{ChatMessage, ChatRequest, ChatStream, Role};
pub use domain::llm_provider::LlmProvider;
pub use domain::vector_store::{FileCounts, RemoteFile, ScoredChunk, SearchQuery, VectorStore, VectorStoreStatus};
pub use infrastructure::{ApiError, OpenAiClient, PromptTemplate, TemplateError};
