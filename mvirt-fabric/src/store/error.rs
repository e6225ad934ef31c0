//! Store error types.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Conflict with existing resource.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed request (duplicate interfaces, invalid VLAN, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The derived network placement would break an invariant; nothing was written.
    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    /// Not the leader, request should be forwarded.
    #[error("not leader, try node {leader_id:?}")]
    NotLeader { leader_id: Option<u64> },

    /// Internal error.
    #[error("internal: {0}")]
    Internal(String),
}

impl StoreError {
    /// Map a rejected command's code to an error.
    pub fn from_code(code: u32, message: String) -> Self {
        match code {
            400 => StoreError::InvalidInput(message),
            404 => StoreError::NotFound(message),
            409 => StoreError::Conflict(message),
            500 => StoreError::InconsistentState(message),
            _ => StoreError::Internal(message),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert!(matches!(
            StoreError::from_code(400, "x".into()),
            StoreError::InvalidInput(_)
        ));
        assert!(matches!(
            StoreError::from_code(404, "x".into()),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from_code(409, "x".into()),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            StoreError::from_code(500, "x".into()),
            StoreError::InconsistentState(_)
        ));
        assert!(matches!(
            StoreError::from_code(0, "x".into()),
            StoreError::Internal(_)
        ));
    }
}
