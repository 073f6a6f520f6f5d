//! DigitalOcean REST API client (read-only)
//!
//! Only `GET` endpoints are wrapped. Terraform performs every mutation.

use crate::error::{DigitalOceanError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DIGITALOCEAN_API_BASE: &str = "https://api.digitalocean.com";

/// Upper bound on followed `links.pages.next` hops
const MAX_PAGES: usize = 100;
const PER_PAGE: u32 = 200;

/// DigitalOcean API client
pub struct DigitalOceanClient {
    client: reqwest::Client,
    api_base: String,
    api_token: String,
}

impl DigitalOceanClient {
    pub fn new(
        api_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_token: api_token.into(),
        })
    }

    /// `GET /v2/account`
    pub async fn account(&self) -> Result<AccountInfo> {
        let url = format!("{}/v2/account", self.api_base);
        let body: AccountResponse = self.get_json(&url).await?;
        Ok(body.account)
    }

    /// `GET /v2/droplets`, all pages
    pub async fn list_droplets(&self) -> Result<Vec<Droplet>> {
        self.list_paginated("/v2/droplets", "droplets").await
    }

    /// `GET /v2/firewalls`, all pages
    pub async fn list_firewalls(&self) -> Result<Vec<Firewall>> {
        self.list_paginated("/v2/firewalls", "firewalls").await
    }

    /// `GET /v2/account/keys`, all pages
    pub async fn list_ssh_keys(&self) -> Result<Vec<SshKeyInfo>> {
        self.list_paginated("/v2/account/keys", "ssh_keys").await
    }

    async fn list_paginated<T: DeserializeOwned>(&self, path: &str, key: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(format!("{}{}?per_page={}", self.api_base, path, PER_PAGE));
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                return Err(DigitalOceanError::MalformedResponse(format!(
                    "{} returned more than {} pages",
                    path, MAX_PAGES
                )));
            }

            let mut body: serde_json::Value = self.get_json(&url).await?;
            let page = body
                .get_mut(key)
                .map(serde_json::Value::take)
                .ok_or_else(|| {
                    DigitalOceanError::MalformedResponse(format!("missing '{}' in {}", key, path))
                })?;
            let mut page_items: Vec<T> = serde_json::from_value(page)?;
            items.append(&mut page_items);

            next = body
                .pointer("/links/pages/next")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }

        tracing::debug!("{}: {} item(s) over {} page(s)", path, items.len(), pages);
        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(DigitalOceanError::Unauthorized {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }
        if !status.is_success() {
            return Err(DigitalOceanError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account: AccountInfo,
}

/// Account details from `GET /v2/account`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub email: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub droplet_limit: Option<u32>,
}

/// Droplet information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Droplet {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub size_slug: Option<String>,
    #[serde(default)]
    pub region: Option<RegionRef>,
    #[serde(default)]
    pub networks: Option<Networks>,
}

impl Droplet {
    /// Get the public IPv4 address
    pub fn public_ipv4(&self) -> Option<String> {
        self.networks
            .as_ref()?
            .v4
            .iter()
            .find(|n| n.network_type.as_deref() == Some("public"))
            .map(|n| n.ip_address.clone())
    }

    pub fn created_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let raw = self.created_at.as_deref()?;
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionRef {
    pub slug: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Networks {
    #[serde(default)]
    pub v4: Vec<NetworkV4>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkV4 {
    pub ip_address: String,
    #[serde(rename = "type", default)]
    pub network_type: Option<String>,
}

/// Cloud firewall information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Firewall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub droplet_ids: Vec<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// SSH key registered on the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKeyInfo {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
}
