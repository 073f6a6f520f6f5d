//! Cloud provider error types

use thiserror::Error;

/// Cloud provider errors
#[derive(Error, Debug)]
pub enum CloudError {
    /// The provider could not be queried (transport error, timeout, 5xx,
    /// unreadable response)
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// Credentials rejected or insufficiently scoped
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;
