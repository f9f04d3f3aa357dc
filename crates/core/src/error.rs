//! Error type shared by the persistence backends.

use thiserror::Error;

/// Errors returned by the record and file stores.
///
/// `Unavailable` covers every I/O or database failure; the sync engine treats it
/// as a cycle failure so the snapshot is not advanced and the next cycle retries.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing service (database, filesystem) could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Whether this error means the backing service failed (as opposed to bad data).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::Unavailable("disk full".to_string());
        assert_eq!(err.to_string(), "store unavailable: disk full");
        assert!(err.is_unavailable());

        let err = StoreError::NotFound("subscriber 42".to_string());
        assert_eq!(err.to_string(), "not found: subscriber 42");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn test_io_error_maps_to_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(err.is_unavailable());
    }
}
