//! Public IP discovery
//!
//! The admin UI firewall rule is scoped to the operator's current public
//! address, so a failed lookup is fatal rather than a reason to fall back to
//! an open rule.

use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::time::Duration;
use wardrobe_config::NetworkSettings;

/// Network facts resolved once per run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkContext {
    pub public_ip: Ipv4Addr,
}

impl NetworkContext {
    /// The public address as a single-host CIDR
    pub fn admin_source(&self) -> String {
        format!("{}/32", self.public_ip)
    }
}

#[async_trait]
pub trait ContextResolver: Send + Sync {
    async fn resolve(&self) -> Result<NetworkContext>;
}

/// Looks up the public IP through a primary service and one fallback
pub struct HttpContextResolver {
    client: reqwest::Client,
    primary_url: String,
    fallback_url: String,
}

impl HttpContextResolver {
    pub fn new(
        primary_url: impl Into<String>,
        fallback_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            primary_url: primary_url.into(),
            fallback_url: fallback_url.into(),
        })
    }

    pub fn from_settings(settings: &NetworkSettings) -> Result<Self> {
        Self::new(
            &settings.primary_ip_lookup_url,
            &settings.fallback_ip_lookup_url,
            settings.lookup_timeout(),
        )
    }

    async fn lookup(&self, url: &str) -> std::result::Result<Ipv4Addr, String> {
        tracing::debug!("Looking up public IP via {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{} returned HTTP {}", url, status.as_u16()));
        }

        let body = response.text().await.map_err(|e| e.to_string())?;
        body.trim()
            .parse::<Ipv4Addr>()
            .map_err(|_| format!("{} returned an unparsable address", url))
    }
}

#[async_trait]
impl ContextResolver for HttpContextResolver {
    async fn resolve(&self) -> Result<NetworkContext> {
        let primary = match self.lookup(&self.primary_url).await {
            Ok(ip) => return Ok(NetworkContext { public_ip: ip }),
            Err(e) => e,
        };
        tracing::warn!("Primary IP lookup failed ({}), trying fallback", primary);

        match self.lookup(&self.fallback_url).await {
            Ok(ip) => Ok(NetworkContext { public_ip: ip }),
            Err(fallback) => Err(ProvisionError::NetworkContextUnavailable { primary, fallback }),
        }
    }
}
