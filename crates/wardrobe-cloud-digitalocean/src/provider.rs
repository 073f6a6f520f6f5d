//! DigitalOcean inventory scanner

use crate::client::{DigitalOceanClient, Droplet, Firewall, SshKeyInfo};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use wardrobe_cloud::{
    AuthStatus, InventoryScanner, RemoteResource, ResourceInventory, ResourceKind, TagNamespace,
};

/// DigitalOcean provider
pub struct DigitalOceanProvider {
    client: DigitalOceanClient,
}

impl DigitalOceanProvider {
    pub fn new(
        api_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: DigitalOceanClient::new(api_token, api_base, timeout)?,
        })
    }

}

fn droplet_resource(droplet: Droplet) -> RemoteResource {
    let mut resource = RemoteResource::new(
        ResourceKind::Droplet,
        droplet.name.clone(),
        droplet.id.to_string(),
    )
    .with_tags(droplet.tags.clone());

    if let Some(status) = &droplet.status {
        resource = resource.with_status(status.clone());
    }
    if let Some(region) = &droplet.region {
        resource = resource.with_region(region.slug.clone());
    }
    if let Some(size) = &droplet.size_slug {
        resource = resource.with_size(size.clone());
    }
    if let Some(ip) = droplet.public_ipv4() {
        resource = resource.with_ipv4(ip);
    }
    if let Some(created_at) = droplet.created_at_utc() {
        resource = resource.with_created_at(created_at);
    }
    resource
}

fn firewall_resource(firewall: Firewall) -> RemoteResource {
    let mut resource = RemoteResource::new(ResourceKind::Firewall, firewall.name, firewall.id)
        .with_tags(firewall.tags);
    if let Some(status) = firewall.status {
        resource = resource.with_status(status);
    }
    resource
}

fn ssh_key_resource(key: SshKeyInfo) -> RemoteResource {
    RemoteResource::new(ResourceKind::SshKey, key.name, key.id.to_string())
}

#[async_trait]
impl InventoryScanner for DigitalOceanProvider {
    fn name(&self) -> &str {
        "digitalocean"
    }

    fn display_name(&self) -> &str {
        "DigitalOcean"
    }

    async fn check_auth(&self) -> wardrobe_cloud::Result<AuthStatus> {
        match self.client.account().await {
            Ok(account) => Ok(AuthStatus::ok(account.email)),
            Err(crate::DigitalOceanError::Unauthorized { message, .. }) => {
                Ok(AuthStatus::failed(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn scan(&self, namespace: &TagNamespace) -> wardrobe_cloud::Result<ResourceInventory> {
        tracing::info!("Scanning DigitalOcean for resources in '{}'", namespace);

        let droplets = self.client.list_droplets().await?;
        let firewalls = self.client.list_firewalls().await?;
        let ssh_keys = self.client.list_ssh_keys().await?;

        let mut inventory = ResourceInventory::new();

        for droplet in droplets {
            if namespace.matches(&droplet.name, &droplet.tags) {
                inventory.add(droplet_resource(droplet));
            }
        }
        for firewall in firewalls {
            if namespace.matches(&firewall.name, &firewall.tags) {
                inventory.add(firewall_resource(firewall));
            }
        }
        for key in ssh_keys {
            // Account keys carry no tags
            if namespace.matches(&key.name, &[]) {
                inventory.add(ssh_key_resource(key));
            }
        }

        tracing::info!("Found {} resource(s) in '{}'", inventory.len(), namespace);
        Ok(inventory)
    }

    async fn find_ssh_key(&self, fingerprint: &str) -> wardrobe_cloud::Result<Option<RemoteResource>> {
        let keys = self.client.list_ssh_keys().await?;
        let found = keys.into_iter().find(|key| {
            key.fingerprint
                .as_deref()
                .is_some_and(|f| f.eq_ignore_ascii_case(fingerprint))
        });
        if let Some(key) = &found {
            tracing::debug!("SSH key {} is registered as '{}'", fingerprint, key.name);
        }
        Ok(found.map(ssh_key_resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use serde_json::json;
    use std::collections::HashMap;
    use wardrobe_cloud::CloudError;

    async fn bind() -> (tokio::net::TcpListener, String) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    fn serve(listener: tokio::net::TcpListener, app: Router) {
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
    }

    fn provider(base: &str) -> DigitalOceanProvider {
        DigitalOceanProvider::new("dop_v1_test", base, Duration::from_secs(5)).unwrap()
    }

    async fn droplets(
        State(base): State<String>,
        Query(q): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        if q.get("page").map(String::as_str) == Some("2") {
            axum::Json(json!({
                "droplets": [{
                    "id": 2, "name": "wardrobe-vpn-lon1", "status": "active", "tags": [],
                    "size_slug": "s-1vcpu-1gb", "region": {"slug": "lon1"},
                    "networks": {"v4": [{"ip_address": "203.0.113.9", "type": "public"}]}
                }],
                "links": {}
            }))
        } else {
            axum::Json(json!({
                "droplets": [
                    {"id": 1, "name": "web-01", "tags": ["production"]},
                    {"id": 3, "name": "office", "tags": ["wardrobe-vpn"]}
                ],
                "links": {"pages": {"next": format!("{}/v2/droplets?page=2", base)}}
            }))
        }
    }

    fn populated_app(base: String) -> Router {
        Router::new()
            .route("/v2/droplets", get(droplets))
            .route(
                "/v2/firewalls",
                get(|| async {
                    axum::Json(json!({
                        "firewalls": [
                            {"id": "fw-a", "name": "wardrobe-vpn-lon1-fw", "status": "succeeded"},
                            {"id": "fw-b", "name": "default", "tags": []}
                        ],
                        "links": {}
                    }))
                }),
            )
            .route(
                "/v2/account/keys",
                get(|| async {
                    axum::Json(json!({
                        "ssh_keys": [
                            {"id": 77, "name": "wardrobe-vpn-lon1-key", "fingerprint": "aa:bb"},
                            {"id": 78, "name": "laptop", "fingerprint": "3c:5e:0f:9a"}
                        ],
                        "links": {}
                    }))
                }),
            )
            .with_state(base)
    }

    #[tokio::test]
    async fn test_scan_filters_namespace_and_follows_pages() {
        let (listener, base) = bind().await;
        serve(listener, populated_app(base.clone()));

        let inventory = provider(&base)
            .scan(&TagNamespace::new("wardrobe-vpn"))
            .await
            .unwrap();

        let names: Vec<_> = inventory.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "office",
                "wardrobe-vpn-lon1",
                "wardrobe-vpn-lon1-fw",
                "wardrobe-vpn-lon1-key"
            ]
        );

        let droplet = inventory
            .droplets()
            .into_iter()
            .find(|d| d.remote_id == "2")
            .unwrap();
        assert_eq!(droplet.ipv4.as_deref(), Some("203.0.113.9"));
        assert_eq!(droplet.region.as_deref(), Some("lon1"));
    }

    #[tokio::test]
    async fn test_find_ssh_key_outside_namespace() {
        let (listener, base) = bind().await;
        serve(listener, populated_app(base.clone()));
        let provider = provider(&base);

        let inventory = provider.scan(&TagNamespace::new("wardrobe-vpn")).await.unwrap();
        assert!(inventory.iter().all(|r| r.name != "laptop"));

        let key = provider.find_ssh_key("3C:5E:0F:9A").await.unwrap().unwrap();
        assert_eq!(key.kind, ResourceKind::SshKey);
        assert_eq!(key.name, "laptop");
        assert_eq!(key.remote_id, "78");

        assert!(provider.find_ssh_key("00:11:22:33").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_empty_account() {
        let (listener, base) = bind().await;
        let app = Router::new()
            .route("/v2/droplets", get(|| async { axum::Json(json!({"droplets": []})) }))
            .route("/v2/firewalls", get(|| async { axum::Json(json!({"firewalls": []})) }))
            .route("/v2/account/keys", get(|| async { axum::Json(json!({"ssh_keys": []})) }));
        serve(listener, app);

        let inventory = provider(&base)
            .scan(&TagNamespace::new("wardrobe-vpn"))
            .await
            .unwrap();
        assert!(inventory.is_empty());
    }

    #[tokio::test]
    async fn test_scan_unauthorized() {
        let (listener, base) = bind().await;
        let app = Router::new().route(
            "/v2/droplets",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    axum::Json(json!({"id": "unauthorized", "message": "Unable to authenticate you"})),
                )
            }),
        );
        serve(listener, app);

        let err = provider(&base)
            .scan(&TagNamespace::new("wardrobe-vpn"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::AuthError(_)));
    }

    #[tokio::test]
    async fn test_scan_server_error_and_malformed_body() {
        let (listener, base) = bind().await;
        let app = Router::new()
            .route(
                "/v2/droplets",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "unavailable") }),
            );
        serve(listener, app);
        let err = provider(&base)
            .scan(&TagNamespace::new("wardrobe-vpn"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ProviderUnreachable(_)));

        let (listener, base) = bind().await;
        let app = Router::new().route("/v2/droplets", get(|| async { "not json" }));
        serve(listener, app);
        let err = provider(&base)
            .scan(&TagNamespace::new("wardrobe-vpn"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ProviderUnreachable(_)));
    }

    #[tokio::test]
    async fn test_scan_unreachable_host() {
        // Bind then drop to get a port nothing listens on
        let (listener, base) = bind().await;
        drop(listener);

        let err = provider(&base)
            .scan(&TagNamespace::new("wardrobe-vpn"))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::ProviderUnreachable(_)));
    }

    #[tokio::test]
    async fn test_check_auth() {
        let (listener, base) = bind().await;
        let app = Router::new().route(
            "/v2/account",
            get(|| async {
                axum::Json(json!({"account": {"email": "ops@example.com", "status": "active", "droplet_limit": 10}}))
            }),
        );
        serve(listener, app);

        let status = provider(&base).check_auth().await.unwrap();
        assert!(status.authenticated);
        assert_eq!(status.account_info.as_deref(), Some("ops@example.com"));

        let (listener, base) = bind().await;
        let app = Router::new().route(
            "/v2/account",
            get(|| async { (StatusCode::FORBIDDEN, axum::Json(json!({"message": "forbidden"}))) }),
        );
        serve(listener, app);

        let status = provider(&base).check_auth().await.unwrap();
        assert!(!status.authenticated);
        assert_eq!(status.error.as_deref(), Some("forbidden"));
    }
}
