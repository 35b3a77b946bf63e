//! Error taxonomy for the diagram engine.
//!
//! Every variant here is handled at the boundary where it occurs and turned
//! into a user-visible notification; none of them is allowed to propagate as
//! an unhandled fault that would blank the canvas.

use thiserror::Error;
use uuid::Uuid;

/// Failures raised while creating or resolving connections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// An item cannot be connected to itself.
    #[error("an item cannot be connected to itself")]
    SelfConnection,
    /// One of the endpoints did not exist at creation time.
    #[error("connection endpoint {0} does not exist")]
    MissingEndpoint(Uuid),
}

/// Failures raised while restoring a persisted document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The stored payload is not valid JSON at all.
    #[error("stored document is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Top-level shape validation failed (e.g. `items` is not a list).
    #[error("stored document failed shape validation: {0}")]
    InvalidShape(String),
}

/// Raised when undo/redo is requested with nothing on the respective stack.
/// Reported as a no-op notice, never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_error_messages_are_user_facing() {
        assert_eq!(
            ConnectionError::SelfConnection.to_string(),
            "an item cannot be connected to itself"
        );
        let id = Uuid::nil();
        assert!(ConnectionError::MissingEndpoint(id)
            .to_string()
            .contains(&id.to_string()));
    }

    #[test]
    fn history_error_messages() {
        assert_eq!(HistoryError::NothingToUndo.to_string(), "nothing to undo");
        assert_eq!(HistoryError::NothingToRedo.to_string(), "nothing to redo");
    }
}
