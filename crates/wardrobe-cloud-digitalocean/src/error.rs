//! DigitalOcean provider error types

use thiserror::Error;
use wardrobe_cloud::CloudError;

#[derive(Error, Debug)]
pub enum DigitalOceanError {
    #[error("DigitalOcean rejected the API token (HTTP {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("DigitalOcean API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected API response: {0}")]
    MalformedResponse(String),

    #[error("Invalid SSH public key: {0}")]
    InvalidPublicKey(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<DigitalOceanError> for CloudError {
    fn from(err: DigitalOceanError) -> Self {
        match err {
            DigitalOceanError::Unauthorized { .. } => CloudError::AuthError(err.to_string()),
            DigitalOceanError::InvalidPublicKey(msg) => CloudError::InvalidConfig(msg),
            other => CloudError::ProviderUnreachable(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DigitalOceanError>;
