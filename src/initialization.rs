use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::AsyncWrite;

use crate::application::chat_session::{ChatSession, ChatSettings};
use crate::application::indexing::{wait_until_completed, PollPolicy};
use crate::application::ingestion::ingest_documents;
use crate::application::retrieval::Retriever;
use crate::config::AppConfig;
use crate::domain::llm_provider::LlmProvider;
use crate::domain::vector_store::VectorStore;
use crate::infrastructure::prompt_template::PromptTemplate;

/// Uploads the configured documents and blocks until the vector store over
/// them has finished indexing.
pub async fn prepare_vector_store<W>(
    config: &AppConfig,
    provider: &dyn LlmProvider,
    out: &mut W,
) -> Result<VectorStore>
where
    W: AsyncWrite + Unpin,
{
    // Fail before uploading anything if the template is unreadable.
    PromptTemplate::load(&config.chat.system_prompt_path)?;

    let store = ingest_documents(
        provider,
        &config.documents.dir,
        &config.documents.extension,
        &config.documents.store_name,
        out,
    )
    .await
    .context("Document ingestion failed")?;

    let policy = PollPolicy::from_config(&config.indexing);
    log::info!("Waiting for vector store {} with {:?}", store.id, policy);
    wait_until_completed(provider, store, &policy, out).await
}

/// Builds the interactive session over a completed store.
pub fn build_chat_session(
    config: &AppConfig,
    provider: Arc<dyn LlmProvider>,
    store: &VectorStore,
) -> Result<ChatSession> {
    let retriever = Retriever::new(store, config.retrieval.score_threshold, config.retrieval.max_results)?;
    let settings = ChatSettings {
        model: config.api.chat_model.clone(),
        system_prompt_path: config.chat.system_prompt_path.clone(),
        keep_history: config.chat.keep_history,
    };
    Ok(ChatSession::new(provider, retriever, settings))
}
