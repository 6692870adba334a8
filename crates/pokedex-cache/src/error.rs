//! Error types for cache and coalescing operations

use thiserror::Error;

/// Errors produced by the coalescing layer itself.
///
/// Failures of the work being coalesced are reported through the caller's own
/// error type; this enum only covers what can go wrong around that work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The caller's cancellation token fired before the shared fetch settled
    #[error("wait cancelled for key: {0}")]
    Cancelled(String),

    /// The task driving an in-flight fetch panicked or was aborted
    #[error("in-flight task for key {key} failed: {reason}")]
    TaskFailed {
        /// Key the task was registered under
        key: String,
        /// Join error text
        reason: String,
    },
}

/// Result alias for cache operations
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CacheError::Cancelled("https://example.test/a".to_string());
        assert_eq!(
            err.to_string(),
            "wait cancelled for key: https://example.test/a"
        );

        let err = CacheError::TaskFailed {
            key: "k".to_string(),
            reason: "task 7 panicked".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "in-flight task for key k failed: task 7 panicked"
        );
    }
}
