use serde::{Deserialize, Serialize};
use std::fmt;

/// A file accepted by the remote file store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreStatus {
    InProgress,
    Completed,
    Expired,
    Other(String),
}

impl VectorStoreStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "expired" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for VectorStoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCounts {
    #[serde(default)]
    pub in_progress: u64,
    #[serde(default)]
    pub completed: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub cancelled: u64,
    #[serde(default)]
    pub total: u64,
}

/// Client-side view of a remote vector store. Only ever a snapshot: callers
/// re-fetch it by id to observe progress.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStore {
    pub id: String,
    pub name: String,
    pub status: VectorStoreStatus,
    pub file_counts: FileCounts,
}

impl VectorStore {
    pub fn is_completed(&self) -> bool {
        self.status == VectorStoreStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub max_results: usize,
}

/// A fragment of indexed document content returned by a vector-store search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub file_id: String,
    pub filename: String,
    /// Relevance in [0, 1], higher is better.
    pub score: f32,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_known_values() {
        assert_eq!(VectorStoreStatus::parse("in_progress"), VectorStoreStatus::InProgress);
        assert_eq!(VectorStoreStatus::parse("completed"), VectorStoreStatus::Completed);
        assert_eq!(VectorStoreStatus::parse("expired"), VectorStoreStatus::Expired);
    }

    #[test]
    fn test_status_keeps_unknown_value() {
        let status = VectorStoreStatus::parse("cancelling");
        assert_eq!(status, VectorStoreStatus::Other("cancelling".to_string()));
        assert_eq!(status.to_string(), "cancelling");
    }

    #[test]
    fn test_only_completed_store_is_completed() {
        let mut store = VectorStore {
            id: "vs_1".to_string(),
            name: "docs".to_string(),
            status: VectorStoreStatus::InProgress,
            file_counts: FileCounts::default(),
        };
        assert!(!store.is_completed());
        store.status = VectorStoreStatus::Completed;
        assert!(store.is_completed());
    }
}
