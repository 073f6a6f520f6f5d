//! Cloud provider trait definition

use crate::error::Result;
use crate::inventory::{RemoteResource, ResourceInventory, TagNamespace};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Read-only view of a cloud account
///
/// Implementations query the provider for resources in a namespace. They
/// never create, modify or delete anything; Terraform is the only mutator of
/// remote state.
#[async_trait]
pub trait InventoryScanner: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    /// Verify the API token against the account endpoint
    ///
    /// A rejected token is reported as `AuthStatus { authenticated: false }`
    /// rather than an error.
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// List droplets, firewalls and SSH keys belonging to `namespace`
    ///
    /// An account with no matching resources yields an empty inventory, not
    /// an error. Fails with `ProviderUnreachable` when the query cannot
    /// complete and `AuthError` when the credentials are rejected.
    async fn scan(&self, namespace: &TagNamespace) -> Result<ResourceInventory>;

    /// Account SSH key with the given MD5 fingerprint, whatever its name
    async fn find_ssh_key(&self, fingerprint: &str) -> Result<Option<RemoteResource>>;
}

/// Outcome of a credential check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    /// Account e-mail when the token was accepted
    pub account_info: Option<String>,
    /// Provider message when it was rejected
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
