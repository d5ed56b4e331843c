pub mod api_error;
pub mod file_system;
pub mod openai;
pub mod prompt_template;
pub mod sse;

// Re-export key types for easier access from application layer
pub use api_error::ApiError;
pub use openai::OpenAiClient;
pub use prompt_template::{PromptTemplate, TemplateError};
