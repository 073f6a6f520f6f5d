//! Deployment intent
//!
//! [`IntentParams`] carries raw values from settings and CLI flags.
//! [`DeploymentIntent::validate`] checks them and loads the SSH public key,
//! so that nothing downstream has to deal with malformed input.

use crate::error::{ProvisionError, Result};
use ipnet::{IpNet, Ipv4Net};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use wardrobe_cloud::TagNamespace;
use wardrobe_cloud_digitalocean::{PublicKey, is_known_region};
use wardrobe_config::Settings;

/// Droplet names double as hostnames
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9.-]*[a-z0-9])?$").expect("static regex")
});

/// Raw, unvalidated deployment parameters
#[derive(Debug, Clone)]
pub struct IntentParams {
    pub name: Option<String>,
    pub namespace: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_public_key_path: Option<PathBuf>,
    pub wireguard_port: u16,
    pub admin_port: u16,
    pub vpn_subnet: String,
    pub maintenance_sources: Vec<String>,
}

impl IntentParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            name: None,
            namespace: settings.namespace.clone(),
            region: settings.region.clone(),
            size: settings.size.clone(),
            image: settings.image.clone(),
            ssh_public_key_path: settings.ssh_key_path.clone(),
            wireguard_port: settings.firewall.wireguard_port,
            admin_port: settings.firewall.admin_port,
            vpn_subnet: settings.firewall.vpn_subnet.clone(),
            maintenance_sources: settings.firewall.maintenance_sources.clone(),
        }
    }
}

/// Port and source policy for the droplet firewall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallPolicy {
    pub wireguard_port: u16,
    pub admin_port: u16,
    pub vpn_subnet: Ipv4Net,
    pub maintenance_sources: Vec<IpNet>,
}

/// The operator's key, already on the account under a name of its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredKey {
    pub id: String,
    pub name: String,
    pub fingerprint: String,
}

/// A validated description of the single VPN server to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentIntent {
    pub name: String,
    pub namespace: TagNamespace,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_public_key_path: PathBuf,
    pub public_key: PublicKey,
    /// Set when the droplet should use an existing account key instead of
    /// registering `public_key` again
    pub registered_key: Option<RegisteredKey>,
    pub firewall: FirewallPolicy,
}

impl DeploymentIntent {
    pub fn validate(params: IntentParams) -> Result<Self> {
        let namespace = TagNamespace::new(&params.namespace);
        if namespace.tag().is_empty() {
            return Err(invalid("namespace must not be empty"));
        }

        let region = required("region", &params.region)?.to_lowercase();
        if !is_known_region(&region) {
            tracing::warn!("Region '{}' is not in the known region list", region);
        }
        let size = required("size", &params.size)?.to_string();
        let image = required("image", &params.image)?.to_string();

        let name = deployment_name(&namespace, &region, params.name.as_deref())?;

        if params.wireguard_port == 0 || params.admin_port == 0 {
            return Err(invalid("ports must be non-zero"));
        }
        if params.wireguard_port == params.admin_port {
            return Err(invalid("WireGuard and admin UI ports must differ"));
        }

        let vpn_subnet: Ipv4Net = params
            .vpn_subnet
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid VPN subnet '{}'", params.vpn_subnet)))?;

        if params.maintenance_sources.is_empty() {
            return Err(invalid("at least one SSH maintenance source CIDR is required"));
        }
        let maintenance_sources = params
            .maintenance_sources
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<IpNet>()
                    .map_err(|_| invalid(format!("invalid maintenance source CIDR '{}'", s)))
            })
            .collect::<Result<Vec<_>>>()?;

        let ssh_public_key_path = params.ssh_public_key_path.ok_or_else(|| {
            ProvisionError::MissingCredential(
                "no SSH public key found; pass --ssh-key, or --generate-key to create one"
                    .to_string(),
            )
        })?;
        let public_key = load_public_key(&ssh_public_key_path)?;

        Ok(Self {
            name,
            namespace,
            region,
            size,
            image,
            ssh_public_key_path,
            public_key,
            registered_key: None,
            firewall: FirewallPolicy {
                wireguard_port: params.wireguard_port,
                admin_port: params.admin_port,
                vpn_subnet,
                maintenance_sources,
            },
        })
    }

    pub fn firewall_name(&self) -> String {
        format!("{}-fw", self.name)
    }

    pub fn ssh_key_name(&self) -> String {
        format!("{}-key", self.name)
    }

    pub fn with_registered_key(mut self, key: RegisteredKey) -> Self {
        self.registered_key = Some(key);
        self
    }
}

fn invalid(msg: impl Into<String>) -> ProvisionError {
    ProvisionError::InvalidIntent(msg.into())
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(invalid(format!("{} must not be empty", field)));
    }
    Ok(value)
}

/// Resolve the droplet name, keeping it inside the namespace prefix
fn deployment_name(namespace: &TagNamespace, region: &str, name: Option<&str>) -> Result<String> {
    let name = match name.map(str::trim) {
        None | Some("") => format!("{}-{}", namespace, region),
        Some(n) => {
            let n = n.to_lowercase();
            if namespace.matches(&n, &[]) {
                n
            } else {
                format!("{}-{}", namespace, n)
            }
        }
    };

    if !NAME_PATTERN.is_match(&name) {
        return Err(invalid(format!(
            "deployment name '{}' may only contain lowercase letters, digits, '.' and '-'",
            name
        )));
    }
    Ok(name)
}

fn load_public_key(path: &Path) -> Result<PublicKey> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        invalid(format!("cannot read SSH public key {}: {}", path.display(), e))
    })?;
    PublicKey::parse(&content).map_err(|e| invalid(format!("{}: {}", path.display(), e)))
}
