//! SSH key pair generation
//!
//! Drives `ssh-keygen` through the [`ProcessRunner`] to create an unencrypted
//! ed25519 pair for operators who have no key yet.

use crate::error::{ProvisionError, Result};
use crate::runner::{CommandSpec, ProcessRunner};
use std::fs::{DirBuilder, Permissions};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wardrobe_config::KeygenSettings;

/// Comment embedded in generated public keys
pub const KEY_COMMENT: &str = "wardrobe-vpn";

/// The `ssh-keygen` CLI
pub struct KeyGenerator {
    binary: String,
    runner: ProcessRunner,
    timeout: Duration,
}

impl KeyGenerator {
    pub fn new(settings: &KeygenSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            runner: ProcessRunner::default(),
            timeout: settings.timeout(),
        }
    }

    /// Create `private_key` and `private_key.pub`, returning the public path
    ///
    /// Never overwrites an existing key. A missing parent directory is
    /// created with mode 0700; the private key ends up 0600.
    pub async fn generate(&self, private_key: &Path) -> Result<PathBuf> {
        let public_key = public_key_path(private_key);
        if private_key.exists() || public_key.exists() {
            return Err(ProvisionError::InvalidIntent(format!(
                "SSH key {} already exists; pass it with --ssh-key instead",
                private_key.display()
            )));
        }

        let dir = match private_key.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !dir.exists() {
            DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
        }

        let spec = CommandSpec::new(&self.binary)
            .args(["-q", "-t", "ed25519", "-N", "", "-C", KEY_COMMENT, "-f"])
            .arg(private_key.to_string_lossy());
        self.runner
            .run(&spec, dir, std::iter::empty(), self.timeout)
            .await?;

        if !public_key.is_file() {
            return Err(ProvisionError::InvalidIntent(format!(
                "{} did not write {}",
                self.binary,
                public_key.display()
            )));
        }
        std::fs::set_permissions(private_key, Permissions::from_mode(0o600))?;
        std::fs::set_permissions(&public_key, Permissions::from_mode(0o644))?;

        tracing::info!("Generated SSH key pair {}", private_key.display());
        Ok(public_key)
    }
}

/// `id_ed25519` -> `id_ed25519.pub`
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = private_key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}
