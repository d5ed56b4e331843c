pub mod chat;
pub mod llm_provider;
pub mod vector_store;
