//! OpenSSH public key handling
//!
//! DigitalOcean identifies account keys by the MD5 fingerprint of the
//! decoded key blob, rendered as colon-separated hex.

use crate::error::{DigitalOceanError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Key algorithms accepted as OpenSSH public keys
const ALLOWED_PREFIXES: &[&str] = &["ssh-rsa", "ssh-ed25519", "ssh-dss", "ecdsa-sha2"];

/// A validated OpenSSH public key line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    line: String,
    algorithm: String,
    blob: Vec<u8>,
}

impl PublicKey {
    /// Parse `<algorithm> <base64> [comment]`
    pub fn parse(text: &str) -> Result<Self> {
        let line = text.trim();
        if line.is_empty() {
            return Err(DigitalOceanError::InvalidPublicKey(
                "key file is empty".to_string(),
            ));
        }
        if line.contains("PRIVATE KEY") {
            return Err(DigitalOceanError::InvalidPublicKey(
                "this is a private key; supply the matching .pub file".to_string(),
            ));
        }

        let mut parts = line.split_whitespace();
        let algorithm = parts.next().unwrap_or_default();
        if !ALLOWED_PREFIXES.iter().any(|p| algorithm.starts_with(p)) {
            return Err(DigitalOceanError::InvalidPublicKey(format!(
                "unsupported key type '{}' (expected one of: {})",
                algorithm,
                ALLOWED_PREFIXES.join(", ")
            )));
        }

        let body = parts.next().ok_or_else(|| {
            DigitalOceanError::InvalidPublicKey("missing key body".to_string())
        })?;
        let blob = STANDARD
            .decode(body)
            .map_err(|e| DigitalOceanError::InvalidPublicKey(format!("key body is not base64: {}", e)))?;

        Ok(Self {
            line: line.to_string(),
            algorithm: algorithm.to_string(),
            blob,
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The trimmed key line, exactly as it will be registered
    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// MD5 fingerprint in `aa:bb:...` form
    pub fn fingerprint(&self) -> String {
        let digest = md5::compute(&self.blob);
        digest
            .0
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.line)
    }
}
