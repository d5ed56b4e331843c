pub mod chat_session;
pub mod indexing;
pub mod ingestion;
pub mod retrieval;
