//! Terraform artifact generation
//!
//! [`render`] is pure: the same intent and network context always produce
//! byte-identical files. [`generate`] writes them into a fresh `wardrobe-*`
//! temporary directory owned by the returned [`GeneratedArtifactSet`].

use crate::error::{ProvisionError, Result};
use crate::intent::{DeploymentIntent, RegisteredKey};
use crate::network::NetworkContext;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tera::{Context, Tera};
use wardrobe_cloud::ResourceKind;

const TEMPLATES: [(&str, &str); 5] = [
    ("main.tf", include_str!("../templates/main.tf.tera")),
    ("droplet.tf", include_str!("../templates/droplet.tf.tera")),
    ("firewall.tf", include_str!("../templates/firewall.tf.tera")),
    ("ssh_key.tf", include_str!("../templates/ssh_key.tf.tera")),
    ("cloud-init.yaml", include_str!("../templates/cloud-init.yaml.tera")),
];

/// Saved plan written by `terraform plan -out`
pub const PLAN_FILE: &str = "wardrobe.tfplan";

/// Terraform address of the resource of `kind` in the generated definition
pub fn resource_address(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Droplet => "digitalocean_droplet.vpn_server",
        ResourceKind::Firewall => "digitalocean_firewall.vpn_firewall",
        ResourceKind::SshKey => "digitalocean_ssh_key.vpn_key",
    }
}

const ANYWHERE: [&str; 2] = ["0.0.0.0/0", "::/0"];

/// One file of the Terraform definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKind {
    /// Provider, variables and outputs
    Main,
    Droplet,
    Firewall,
    SshKey,
    CloudInit,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::Main,
        ArtifactKind::Droplet,
        ArtifactKind::Firewall,
        ArtifactKind::SshKey,
        ArtifactKind::CloudInit,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Main => "main.tf",
            ArtifactKind::Droplet => "droplet.tf",
            ArtifactKind::Firewall => "firewall.tf",
            ArtifactKind::SshKey => "ssh_key.tf",
            ArtifactKind::CloudInit => "cloud-init.yaml",
        }
    }
}

/// An inbound firewall rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FirewallRule {
    pub protocol: &'static str,
    pub port: u16,
    pub sources: Vec<String>,
    pub description: &'static str,
}

impl std::fmt::Display for FirewallRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:<5} from {}",
            self.protocol.to_uppercase(),
            self.port,
            self.sources.join(", ")
        )
    }
}

/// Inbound rules for the VPN droplet
///
/// The admin UI is reachable only from the operator's current address and
/// from inside the VPN subnet.
pub fn inbound_rules(intent: &DeploymentIntent, context: &NetworkContext) -> Vec<FirewallRule> {
    let policy = &intent.firewall;
    vec![
        FirewallRule {
            protocol: "tcp",
            port: 22,
            sources: policy
                .maintenance_sources
                .iter()
                .map(|n| n.to_string())
                .collect(),
            description: "SSH (keys only)",
        },
        FirewallRule {
            protocol: "udp",
            port: policy.wireguard_port,
            sources: ANYWHERE.iter().map(|s| s.to_string()).collect(),
            description: "WireGuard",
        },
        FirewallRule {
            protocol: "tcp",
            port: policy.admin_port,
            sources: vec![context.admin_source(), policy.vpn_subnet.to_string()],
            description: "Admin UI (HTTP)",
        },
    ]
}

/// Rendered file contents, keyed by kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactContents {
    files: BTreeMap<ArtifactKind, String>,
}

impl ArtifactContents {
    pub fn get(&self, kind: ArtifactKind) -> Option<&str> {
        self.files.get(&kind).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArtifactKind, &str)> {
        self.files.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Render the Terraform definition without touching the filesystem
pub fn render(intent: &DeploymentIntent, context: &NetworkContext) -> Result<ArtifactContents> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES)?;

    let mut ctx = Context::new();
    ctx.insert("name", &intent.name);
    ctx.insert("region", &intent.region);
    ctx.insert("size", &intent.size);
    ctx.insert("image", &intent.image);
    ctx.insert("tag", intent.namespace.tag());
    ctx.insert("firewall_name", &intent.firewall_name());
    ctx.insert("ssh_key_name", &intent.ssh_key_name());
    ctx.insert("public_key", &hcl_escape(intent.public_key.as_str()));
    let registered_key = intent.registered_key.as_ref().map(|key| RegisteredKey {
        name: key.name.replace(['"', '\n', '\r'], ""),
        ..key.clone()
    });
    ctx.insert("registered_key", &registered_key);
    ctx.insert("inbound_rules", &inbound_rules(intent, context));
    ctx.insert("wireguard_port", &intent.firewall.wireguard_port);
    ctx.insert("admin_port", &intent.firewall.admin_port);

    let mut files = BTreeMap::new();
    for kind in ArtifactKind::ALL {
        files.insert(kind, tera.render(kind.file_name(), &ctx)?);
    }
    Ok(ArtifactContents { files })
}

/// Render and write the artifact set into a new temporary directory
///
/// The directory is created under `parent` when given, otherwise under the
/// system temp dir. Nothing is written if rendering fails.
pub fn generate(
    intent: &DeploymentIntent,
    context: &NetworkContext,
    parent: Option<&Path>,
) -> Result<GeneratedArtifactSet> {
    let contents = render(intent, context)?;

    let mut builder = tempfile::Builder::new();
    builder.prefix("wardrobe-");
    let dir = match parent {
        Some(p) => builder.tempdir_in(p)?,
        None => builder.tempdir()?,
    };

    let mut files = BTreeMap::new();
    for (kind, content) in contents.iter() {
        let path = dir.path().join(kind.file_name());
        std::fs::write(&path, content).map_err(|source| ProvisionError::Artifact {
            path: path.clone(),
            source,
        })?;
        files.insert(kind, path);
    }

    tracing::info!("Generated Terraform artifacts in {}", dir.path().display());
    Ok(GeneratedArtifactSet {
        dir: Some(dir),
        files,
    })
}

/// RAII guard for the generated artifact directory
///
/// Removed by [`cleanup`](Self::cleanup), or on drop when the workflow is
/// abandoned early (error, panic, cancelled future).
pub struct GeneratedArtifactSet {
    dir: Option<TempDir>,
    files: BTreeMap<ArtifactKind, PathBuf>,
}

impl GeneratedArtifactSet {
    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    pub fn file(&self, kind: ArtifactKind) -> Option<&Path> {
        self.files.get(&kind).map(PathBuf::as_path)
    }

    pub fn plan_file(&self) -> PathBuf {
        self.path().join(PLAN_FILE)
    }

    /// Remove the directory and everything Terraform wrote into it
    pub fn cleanup(mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            dir.close()?;
            tracing::debug!("Removed artifact directory {}", path.display());
        }
        Ok(())
    }
}

impl Drop for GeneratedArtifactSet {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            tracing::debug!("Removing artifact directory {} on drop", dir.path().display());
            // TempDir removes itself; errors are ignored here
            drop(dir);
        }
    }
}

/// Escape a value for a double-quoted HCL string
fn hcl_escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("${", "$${")
        .replace("%{", "%%{")
}
