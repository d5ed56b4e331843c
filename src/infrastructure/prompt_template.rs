use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;

use crate::domain::vector_store::ScoredChunk;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("unknown template variable `{name}` at byte {offset}")]
    UnknownVariable { name: String, offset: usize },
    #[error("unterminated `{{{{` at byte {offset}")]
    Unterminated { offset: usize },
}

/// System prompt template with `{{ name }}` placeholders.
///
/// Available variables: `query`, `context` (retained chunks as numbered
/// sections) and `chunk_count`.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read prompt template {:?}", path))?;
        Ok(Self::new(source))
    }

    pub fn render(&self, query: &str, chunks: &[ScoredChunk]) -> Result<String, TemplateError> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let open = offset + start;
            let after_open = &rest[start + 2..];
            let end = after_open
                .find("}}")
                .ok_or(TemplateError::Unterminated { offset: open })?;

            let name = after_open[..end].trim();
            match name {
                "query" => out.push_str(query),
                "context" => out.push_str(&format_context(chunks)),
                "chunk_count" => out.push_str(&chunks.len().to_string()),
                _ => {
                    return Err(TemplateError::UnknownVariable { name: name.to_string(), offset: open });
                }
            }

            let consumed = start + 2 + end + 2;
            rest = &rest[consumed..];
            offset += consumed;
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Formats chunks as numbered sections, one per chunk, in retrieval order.
pub fn format_context(chunks: &[ScoredChunk]) -> String {
    let mut context = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        context.push_str(&format!(
            "[{}] {} (score {:.2})\n\n{}\n\n---\n\n",
            i + 1,
            chunk.filename,
            chunk.score,
            chunk.text.trim()
        ));
    }
    context
}
