use anyhow::Result;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::config::IndexingConfig;
use crate::domain::llm_provider::LlmProvider;
use crate::domain::vector_store::{VectorStore, VectorStoreStatus};

#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("vector store {store_id} still {status} after {waited:?}")]
    Timeout { store_id: String, status: VectorStoreStatus, waited: Duration },
    #[error("vector store {store_id} expired before indexing completed")]
    Expired { store_id: String },
}

/// How often to re-fetch a store while it indexes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &IndexingConfig) -> Self {
        Self {
            initial_interval: config.poll_interval(),
            max_interval: config.max_poll_interval().max(config.poll_interval()),
            backoff_factor: config.backoff_factor,
            timeout: config.timeout(),
        }
    }

    /// Grows `current` by the backoff factor, capped at `max_interval`.
    /// A product that is not a valid `Duration` also yields the cap.
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

/// Re-fetches `store` until it reports `completed`.
///
/// Returns the completed snapshot. Fails on `expired` or once `policy.timeout`
/// has elapsed without completion.
pub async fn wait_until_completed<W>(
    provider: &dyn LlmProvider,
    mut store: VectorStore,
    policy: &PollPolicy,
    out: &mut W,
) -> Result<VectorStore>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(b"[-] wait vector store\n").await?;
    out.flush().await?;

    let started = Instant::now();
    // A timeout too large for the clock means no deadline at all.
    let deadline = started.checked_add(policy.timeout);
    let mut interval = policy.initial_interval;

    while !store.is_completed() {
        if store.status == VectorStoreStatus::Expired {
            return Err(IndexingError::Expired { store_id: store.id }.into());
        }

        let now = Instant::now();
        let sleep_for = match deadline {
            Some(deadline) if now >= deadline => {
                return Err(IndexingError::Timeout {
                    store_id: store.id,
                    status: store.status,
                    waited: now - started,
                }
                .into());
            }
            Some(deadline) => interval.min(deadline - now),
            None => interval,
        };

        tokio::time::sleep(sleep_for).await;
        store = provider.get_vector_store(&store.id).await?;
        log::debug!(
            "Vector store {} is {} ({}/{} files completed, {} failed)",
            store.id,
            store.status,
            store.file_counts.completed,
            store.file_counts.total,
            store.file_counts.failed
        );
        interval = policy.next_interval(interval);
    }

    if store.file_counts.failed > 0 {
        log::warn!("{} files failed to index in vector store {}", store.file_counts.failed, store.id);
    }

    out.write_all(b"[-] done!\n").await?;
    out.flush().await?;
    Ok(store)
}
