//! Error types for catalog operations

use pokedex_cache::CacheError;
use thiserror::Error;

/// Errors surfaced by the catalog
///
/// `Clone` so that a single failed upstream fetch can be handed to every
/// caller that was coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Generation number outside 1-9
    #[error("Invalid generation: {0}")]
    InvalidGeneration(u32),

    /// Type name that is not one of the 18 known types
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Non-2xx response, transport failure or malformed payload
    #[error("Upstream error for {url}: {message}")]
    Upstream {
        /// URL that was requested
        url: String,
        /// HTTP status, absent when no response was received
        status: Option<u16>,
        /// Response body text or a description of the failure
        message: String,
    },

    /// Single-resource lookup that the upstream answered with 404
    #[error("Not found: {resource}")]
    NotFound {
        /// Resource path, such as `pokemon/0`
        resource: String,
    },

    /// The caller's cancellation token fired
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// HTTP client could not be built
    #[error("Transport error: {0}")]
    Transport(String),

    /// The task driving a coalesced fetch panicked
    #[error("Background fetch failed: {0}")]
    TaskFailed(String),
}

impl CatalogError {
    pub(crate) fn upstream(url: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Upstream {
            url: url.to_string(),
            status,
            message: message.into(),
        }
    }

    /// Caller supplied input that can never succeed
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidGeneration(_)
                | Self::InvalidType(_)
                | Self::NotFound { .. }
                | Self::InvalidConfiguration(_)
        )
    }

    /// Check if a later attempt might succeed
    ///
    /// Nothing in this crate retries; callers may use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status: None, .. } | Self::TaskFailed(_) => true,
            Self::Upstream {
                status: Some(status),
                ..
            } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// HTTP status carried by an upstream failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            Self::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

impl From<CacheError> for CatalogError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Cancelled(_) => Self::Cancelled,
            CacheError::TaskFailed { .. } => Self::TaskFailed(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
