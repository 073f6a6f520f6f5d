//! Remote inventory model
//!
//! A [`ResourceInventory`] is a read-only snapshot of the resources that
//! belong to one [`TagNamespace`]. It is only meaningful for the run that
//! produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of remote resource managed by Wardrobe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Droplet,
    Firewall,
    SshKey,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Droplet,
        ResourceKind::Firewall,
        ResourceKind::SshKey,
    ];

    /// Terraform resource type for this kind
    pub fn terraform_type(&self) -> &'static str {
        match self {
            ResourceKind::Droplet => "digitalocean_droplet",
            ResourceKind::Firewall => "digitalocean_firewall",
            ResourceKind::SshKey => "digitalocean_ssh_key",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Droplet => write!(f, "droplet"),
            ResourceKind::Firewall => write!(f, "firewall"),
            ResourceKind::SshKey => write!(f, "ssh_key"),
        }
    }
}

/// Tag / name-prefix convention identifying resources created by this tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNamespace {
    tag: String,
}

impl TagNamespace {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().trim().to_lowercase(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// A resource belongs to the namespace when it carries the tag or its
    /// name starts with the namespace prefix.
    pub fn matches(&self, name: &str, tags: &[String]) -> bool {
        if self.tag.is_empty() {
            return false;
        }
        tags.iter().any(|t| t.eq_ignore_ascii_case(&self.tag))
            || name.to_lowercase().starts_with(&self.tag)
    }
}

impl std::fmt::Display for TagNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag)
    }
}

/// One remote resource as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub kind: ResourceKind,
    pub name: String,
    pub tags: Vec<String>,
    /// Provider-assigned identifier
    pub remote_id: String,
    pub status: Option<String>,
    pub region: Option<String>,
    pub size: Option<String>,
    pub ipv4: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteResource {
    pub fn new(
        kind: ResourceKind,
        name: impl Into<String>,
        remote_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            tags: Vec::new(),
            remote_id: remote_id.into(),
            status: None,
            region: None,
            size: None,
            ipv4: None,
            created_at: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn with_ipv4(mut self, ip: impl Into<String>) -> Self {
        self.ipv4 = Some(ip.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

impl std::fmt::Display for RemoteResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} (id: {})", self.kind, self.name, self.remote_id)?;
        if let Some(ip) = &self.ipv4 {
            write!(f, " ip={}", ip)?;
        }
        if let Some(status) = &self.status {
            write!(f, " status={}", status)?;
        }
        Ok(())
    }
}

/// Snapshot of the resources found in one namespace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceInventory {
    resources: Vec<RemoteResource>,
}

impl ResourceInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, keeping the snapshot ordered by kind, name and id
    pub fn add(&mut self, resource: RemoteResource) {
        let pos = self
            .resources
            .binary_search_by(|r| {
                (r.kind, &r.name, &r.remote_id).cmp(&(
                    resource.kind,
                    &resource.name,
                    &resource.remote_id,
                ))
            })
            .unwrap_or_else(|p| p);
        self.resources.insert(pos, resource);
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteResource> {
        self.resources.iter()
    }

    pub fn by_kind(&self, kind: ResourceKind) -> Vec<&RemoteResource> {
        self.resources.iter().filter(|r| r.kind == kind).collect()
    }

    pub fn droplets(&self) -> Vec<&RemoteResource> {
        self.by_kind(ResourceKind::Droplet)
    }

    /// Resources whose name equals `name` or starts with `name-`
    pub fn for_deployment(&self, name: &str) -> Vec<&RemoteResource> {
        let prefix = format!("{}-", name);
        self.resources
            .iter()
            .filter(|r| r.name == name || r.name.starts_with(&prefix))
            .collect()
    }
}

impl FromIterator<RemoteResource> for ResourceInventory {
    fn from_iter<I: IntoIterator<Item = RemoteResource>>(iter: I) -> Self {
        let mut inventory = ResourceInventory::new();
        for resource in iter {
            inventory.add(resource);
        }
        inventory
    }
}

impl<'a> IntoIterator for &'a ResourceInventory {
    type Item = &'a RemoteResource;
    type IntoIter = std::slice::Iter<'a, RemoteResource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}
