use anyhow::{anyhow, Result};

use crate::domain::llm_provider::LlmProvider;
use crate::domain::vector_store::{ScoredChunk, SearchQuery, VectorStore};

/// Keeps chunks scoring strictly above `threshold`, in their original order.
pub fn filter_relevant(chunks: Vec<ScoredChunk>, threshold: f32) -> Vec<ScoredChunk> {
    chunks.into_iter().filter(|c| c.score > threshold).collect()
}

/// Searches one indexed vector store and drops weak matches.
#[derive(Debug, Clone)]
pub struct Retriever {
    store_id: String,
    score_threshold: f32,
    max_results: usize,
}

impl Retriever {
    /// Only a completed store can be searched.
    pub fn new(store: &VectorStore, score_threshold: f32, max_results: usize) -> Result<Self> {
        if !store.is_completed() {
            return Err(anyhow!("vector store {} is {}, not completed", store.id, store.status));
        }
        Ok(Self { store_id: store.id.clone(), score_threshold, max_results })
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub async fn retrieve(&self, provider: &dyn LlmProvider, query: &str) -> Result<Vec<ScoredChunk>> {
        let search = SearchQuery { text: query.to_string(), max_results: self.max_results };
        let results = provider.search_vector_store(&self.store_id, &search).await?;
        let total = results.len();
        let relevant = filter_relevant(results, self.score_threshold);
        log::debug!(
            "{} of {} chunks scored above {} for {:?}",
            relevant.len(),
            total,
            self.score_threshold,
            query
        );
        Ok(relevant)
    }
}
