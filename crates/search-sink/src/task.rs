//! Asynchronous task handles and their resolved state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an enqueued index mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(pub u64);

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// Terminal states never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enqueued => write!(f, "enqueued"),
            Self::Processing => write!(f, "processing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Error detail attached to a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub message: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.code.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} ({})", self.message, self.code)
        }
    }
}

/// Snapshot of a task as reported by the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub uid: TaskHandle,
    pub status: TaskStatus,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub index_uid: Option<String>,
    #[serde(default)]
    pub error: Option<TaskError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failed_task() {
        let json = r#"{
            "uid": 12,
            "indexUid": "orders",
            "status": "failed",
            "type": "documentAdditionOrUpdate",
            "details": { "receivedDocuments": 1 },
            "error": {
                "message": "Document doesn't have a `id` attribute",
                "code": "missing_document_id",
                "type": "invalid_request",
                "link": "https://docs.meilisearch.com/errors#missing_document_id"
            }
        }"#;
        let task: TaskInfo = serde_json::from_str(json).unwrap();
        assert_eq!(task.uid, TaskHandle(12));
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.status.is_terminal());
        assert_eq!(task.index_uid.as_deref(), Some("orders"));
        let error = task.error.unwrap();
        assert_eq!(error.code, "missing_document_id");
        assert!(error.to_string().contains("missing_document_id"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Enqueued.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Succeeded.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
        assert!(!TaskStatus::Canceled.is_success());
    }
}
