//! Settings model
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Timeouts are stored as whole seconds.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tag and name prefix identifying resources created by this tool
    pub namespace: String,

    /// Default DigitalOcean region slug
    pub region: String,

    /// Default droplet size slug
    pub size: String,

    /// Droplet image slug
    pub image: String,

    /// Default SSH public key
    pub ssh_key_path: Option<PathBuf>,

    pub network: NetworkSettings,
    pub firewall: FirewallSettings,
    pub provider: ProviderSettings,
    pub terraform: TerraformSettings,
    pub health: HealthSettings,
    pub keygen: KeygenSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            namespace: "wardrobe-vpn".to_string(),
            region: "lon1".to_string(),
            size: "s-1vcpu-1gb".to_string(),
            image: "ubuntu-24-04-x64".to_string(),
            ssh_key_path: None,
            network: NetworkSettings::default(),
            firewall: FirewallSettings::default(),
            provider: ProviderSettings::default(),
            terraform: TerraformSettings::default(),
            health: HealthSettings::default(),
            keygen: KeygenSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| ConfigError::InvalidSettings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Public IP lookup services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub primary_ip_lookup_url: String,
    pub fallback_ip_lookup_url: String,
    pub lookup_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            primary_ip_lookup_url: "https://ipv4.icanhazip.com".to_string(),
            fallback_ip_lookup_url: "https://api.ipify.org".to_string(),
            lookup_timeout_secs: 10,
        }
    }
}

impl NetworkSettings {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// Firewall shape of the VPN droplet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallSettings {
    pub wireguard_port: u16,
    pub admin_port: u16,
    pub vpn_subnet: String,
    /// Sources allowed to reach SSH (22)
    pub maintenance_sources: Vec<String>,
}

impl Default for FirewallSettings {
    fn default() -> Self {
        Self {
            wireguard_port: 51820,
            admin_port: 51821,
            vpn_subnet: "10.8.0.0/24".to_string(),
            maintenance_sources: vec!["0.0.0.0/0".to_string(), "::/0".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.digitalocean.com".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ProviderSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Terraform binary and per-invocation timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerraformSettings {
    pub binary: String,
    pub init_timeout_secs: u64,
    pub plan_timeout_secs: u64,
    pub apply_timeout_secs: u64,
    pub output_timeout_secs: u64,
    pub destroy_timeout_secs: u64,
    /// Time between SIGTERM and SIGKILL when an invocation times out
    pub kill_grace_secs: u64,
}

impl Default for TerraformSettings {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            init_timeout_secs: 300,
            plan_timeout_secs: 300,
            apply_timeout_secs: 900,
            output_timeout_secs: 60,
            destroy_timeout_secs: 900,
            kill_grace_secs: 5,
        }
    }
}

impl TerraformSettings {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_secs)
    }

    pub fn apply_timeout(&self) -> Duration {
        Duration::from_secs(self.apply_timeout_secs)
    }

    pub fn output_timeout(&self) -> Duration {
        Duration::from_secs(self.output_timeout_secs)
    }

    pub fn destroy_timeout(&self) -> Duration {
        Duration::from_secs(self.destroy_timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.kill_grace_secs)
    }
}

/// Admin UI polling after apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_secs: 3,
            timeout_secs: 180,
            request_timeout_secs: 5,
        }
    }
}

impl HealthSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `ssh-keygen` used by `deploy --generate-key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeygenSettings {
    pub binary: String,
    pub timeout_secs: u64,
}

impl Default for KeygenSettings {
    fn default() -> Self {
        Self {
            binary: "ssh-keygen".to_string(),
            timeout_secs: 30,
        }
    }
}

impl KeygenSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
