//! Error taxonomy of the synchronization engine.
//!
//! Relations without a replica and tasks that fail on the search engine side
//! are not errors: the first is a silent no-op, the second is counted and
//! logged by the task tracker.

use cdc_types::DecodeError;

/// Error type for handling one replication message.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Payload is not a valid replication message
    #[error("Failed to decode replication message: {0}")]
    Decode(#[from] DecodeError),

    /// A column the replica needs (primary key or pivot) is absent
    #[error("Field '{field}' is missing from the row")]
    MissingField { field: String },

    /// The primary key holds something other than a number
    #[error("Primary key '{field}' must be numeric, found {found}")]
    NonNumericKey { field: String, found: &'static str },

    /// The index mutation could not be submitted
    #[error("Failed to submit index mutation: {0:#}")]
    Write(anyhow::Error),

    /// The database or the search engine failed while we waited on it
    #[error("Transport error: {0:#}")]
    Transport(anyhow::Error),

    /// A full-table flush failed after its buffer was taken. The rows are
    /// gone; redelivering the end marker finds nothing to write.
    #[error("Full replication flush dropped {rows} rows: {source}")]
    BatchDropped {
        rows: usize,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// Whether delivering the same message again may succeed.
    ///
    /// Malformed payloads and rows stay malformed, so only failures of the
    /// collaborators are worth a redelivery.
    pub fn requeue(&self) -> bool {
        matches!(self, Self::Write(_) | Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requeue_classification() {
        assert!(SyncError::Write(anyhow::anyhow!("refused")).requeue());
        assert!(SyncError::Transport(anyhow::anyhow!("timeout")).requeue());
        assert!(!SyncError::MissingField {
            field: "public.orders.id".to_string()
        }
        .requeue());
        assert!(!SyncError::NonNumericKey {
            field: "public.orders.id".to_string(),
            found: "text",
        }
        .requeue());

        let decode = cdc_types::ReplicationMessage::from_slice(b"{").unwrap_err();
        assert!(!SyncError::from(decode).requeue());

        let dropped = SyncError::BatchDropped {
            rows: 3,
            source: Box::new(SyncError::Write(anyhow::anyhow!("refused"))),
        };
        assert!(!dropped.requeue());
        assert!(dropped.to_string().contains("dropped 3 rows"));
    }

    #[test]
    fn test_messages_include_context() {
        let err = SyncError::Write(anyhow::anyhow!("connection refused").context("POST /indexes"));
        let message = err.to_string();
        assert!(message.contains("POST /indexes"));
        assert!(message.contains("connection refused"));
    }
}
