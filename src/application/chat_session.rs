use anyhow::Result;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::application::retrieval::Retriever;
use crate::domain::chat::{ChatMessage, ChatRequest};
use crate::domain::llm_provider::LlmProvider;
use crate::infrastructure::api_error::ApiError;
use crate::infrastructure::prompt_template::PromptTemplate;

pub const PROMPT_MARKER: &str = "> ";

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub system_prompt_path: PathBuf,
    pub keep_history: bool,
}

/// Interactive retrieval-augmented chat over one indexed vector store.
pub struct ChatSession {
    provider: Arc<dyn LlmProvider>,
    retriever: Retriever,
    settings: ChatSettings,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(provider: Arc<dyn LlmProvider>, retriever: Retriever, settings: ChatSettings) -> Self {
        Self { provider, retriever, settings, history: Vec::new() }
    }

    /// Messages from completed turns, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Reads queries line by line until end of input.
    ///
    /// An [`ApiError`] from a turn is reported as `<Class>: <message>` and the
    /// loop moves on to the next prompt. Any other error ends the session.
    pub async fn run<R, W>(&mut self, mut input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut line = String::new();
        loop {
            out.write_all(PROMPT_MARKER.as_bytes()).await?;
            out.flush().await?;

            line.clear();
            if input.read_line(&mut line).await? == 0 {
                log::info!("End of input, leaving chat loop");
                return Ok(());
            }

            let query = line.trim_end_matches(['\n', '\r']);
            if query.trim().is_empty() {
                continue;
            }

            if let Err(err) = self.answer(query, out).await {
                match err.downcast_ref::<ApiError>() {
                    Some(api_error) => {
                        log::warn!("Chat turn failed: {:?}", api_error);
                        out.write_all(format!("{}\n", api_error.report()).as_bytes()).await?;
                        out.flush().await?;
                    }
                    None => return Err(err),
                }
            }
        }
    }

    /// One turn: retrieve, render the system prompt, stream the reply.
    pub async fn answer<W>(&mut self, query: &str, out: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let chunks = self.retriever.retrieve(self.provider.as_ref(), query).await?;

        // Re-read every turn so the template can be edited mid-session.
        let template = PromptTemplate::load(&self.settings.system_prompt_path)?;
        let system = ChatMessage::system(template.render(query, &chunks)?);
        let user = ChatMessage::user(query);

        let mut messages = self.history.clone();
        messages.push(system.clone());
        messages.push(user.clone());
        let request = ChatRequest { model: self.settings.model.clone(), messages };

        let mut stream = self.provider.stream_chat(&request).await?;
        let mut reply = String::new();
        while let Some(delta) = stream.next().await {
            let delta = match delta {
                Ok(delta) => delta,
                Err(err) => {
                    if !reply.is_empty() {
                        out.write_all(b"\n").await?;
                    }
                    return Err(err);
                }
            };
            out.write_all(delta.as_bytes()).await?;
            out.flush().await?;
            reply.push_str(&delta);
        }
        out.write_all(b"\n").await?;
        out.flush().await?;

        if self.settings.keep_history {
            self.history.push(system);
            self.history.push(user);
            self.history.push(ChatMessage::assistant(reply));
        }
        Ok(())
    }
}
