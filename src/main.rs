use anyhow::Result;
use std::sync::Arc;
use tokio::io::{stdin, stdout, BufReader};

use handbook_chat::config;
use handbook_chat::domain::llm_provider::LlmProvider;
use handbook_chat::initialization::{build_chat_session, prepare_vector_store};
use handbook_chat::OpenAiClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // stdout carries the conversation, so logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = config::load_config()?;
    log::info!("Configuration loaded: {:?}", config);

    let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiClient::from_config(&config.api)?);
    let mut out = stdout();

    let store = prepare_vector_store(&config, provider.as_ref(), &mut out).await?;
    log::info!("Vector store {} is ready", store.id);

    let mut session = build_chat_session(&config, provider, &store)?;
    session.run(BufReader::new(stdin()), &mut out).await?;

    log::info!("handbook-chat finished.");
    Ok(())
}
