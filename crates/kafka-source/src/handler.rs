//! The per-message handler contract between the transport and the engine.

use std::fmt;

/// How the transport should treat a message the handler could not process.
#[derive(Debug)]
pub enum HandlerError {
    /// Transient failure: deliver the same message again.
    Requeue(anyhow::Error),
    /// Permanent failure: redelivery cannot help, log and move on.
    Discard(anyhow::Error),
}

impl HandlerError {
    pub fn requeue(&self) -> bool {
        matches!(self, Self::Requeue(_))
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requeue(e) => write!(f, "{e:#}"),
            Self::Discard(e) => write!(f, "{e:#}"),
        }
    }
}

/// Receives the raw payload of every delivered message.
///
/// A message is committed once the handler returns `Ok`, returns
/// [`HandlerError::Discard`], or has returned [`HandlerError::Requeue`] on
/// every allowed attempt.
#[async_trait::async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, payload: &[u8]) -> Result<(), HandlerError>;
}
