//! Planned changes, as reported by Terraform's JSON plan representation
//! (`terraform show -json <planfile>`)

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Represents a planned action for a cloud resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Terraform resource address (e.g., "digitalocean_droplet.vpn_server")
    pub address: String,

    /// Type of action to perform
    pub action_type: ActionType,

    /// Terraform resource type (e.g., "digitalocean_firewall")
    pub resource_type: String,

    /// Resource name within the configuration
    pub name: String,

    /// Planned attribute values after the change
    pub after: serde_json::Value,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource in place
    Update,
    /// Delete and re-create a resource
    Replace,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl ActionType {
    /// Map Terraform's `change.actions` list to an action type
    pub fn from_terraform(actions: &[String]) -> Self {
        let has = |name: &str| actions.iter().any(|a| a == name);
        match (has("create"), has("delete"), has("update")) {
            (true, true, _) => ActionType::Replace,
            (true, false, _) => ActionType::Create,
            (false, true, _) => ActionType::Delete,
            (false, false, true) => ActionType::Update,
            _ => ActionType::NoOp,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Replace => write!(f, "replace"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions to be applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// List of actions to perform
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Parse the output of `terraform show -json <planfile>`
    pub fn from_terraform_json(json: &str) -> Result<Self> {
        let raw: RawPlan = serde_json::from_str(json)?;
        let actions = raw
            .resource_changes
            .into_iter()
            .map(|rc| Action {
                address: rc.address,
                action_type: ActionType::from_terraform(&rc.change.actions),
                resource_type: rc.resource_type,
                name: rc.name,
                after: rc.change.after.unwrap_or(serde_json::Value::Null),
            })
            .collect();
        Ok(Self::new(actions))
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// First action touching a resource of the given Terraform type
    fn find_by_type(&self, resource_type: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.resource_type == resource_type)
    }

    /// Inbound firewall rules as `(protocol, port_range, sources)`
    pub fn inbound_rules(&self) -> Vec<(String, String, Vec<String>)> {
        let Some(firewall) = self.find_by_type("digitalocean_firewall") else {
            return Vec::new();
        };
        firewall
            .after
            .get("inbound_rule")
            .and_then(|rules| rules.as_array())
            .map(|rules| {
                rules
                    .iter()
                    .map(|rule| {
                        let protocol = rule
                            .get("protocol")
                            .and_then(|v| v.as_str())
                            .unwrap_or("-")
                            .to_uppercase();
                        let port = rule
                            .get("port_range")
                            .and_then(|v| v.as_str())
                            .unwrap_or("-")
                            .to_string();
                        let sources = rule
                            .get("source_addresses")
                            .and_then(|v| v.as_array())
                            .map(|arr| {
                                arr.iter()
                                    .filter_map(|s| s.as_str().map(str::to_string))
                                    .collect()
                            })
                            .unwrap_or_default();
                        (protocol, port, sources)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            replace: self.actions_by_type(ActionType::Replace).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub replace: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete, {} unchanged",
            self.create, self.update, self.replace, self.delete, self.no_change
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    resource_changes: Vec<RawResourceChange>,
}

#[derive(Debug, Deserialize)]
struct RawResourceChange {
    address: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    change: RawChange,
}

#[derive(Debug, Deserialize)]
struct RawChange {
    actions: Vec<String>,
    after: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_JSON: &str = r#"{
      "format_version": "1.2",
      "resource_changes": [
        {
          "address": "digitalocean_droplet.vpn_server",
          "type": "digitalocean_droplet",
          "name": "vpn_server",
          "change": {
            "actions": ["create"],
            "after": {"name": "wardrobe-vpn-lon1", "region": "lon1", "size": "s-1vcpu-1gb"}
          }
        },
        {
          "address": "digitalocean_firewall.vpn_firewall",
          "type": "digitalocean_firewall",
          "name": "vpn_firewall",
          "change": {
            "actions": ["create"],
            "after": {
              "inbound_rule": [
                {"protocol": "tcp", "port_range": "22", "source_addresses": ["0.0.0.0/0"]},
                {"protocol": "udp", "port_range": "51820", "source_addresses": ["0.0.0.0/0", "::/0"]}
              ]
            }
          }
        },
        {
          "address": "digitalocean_ssh_key.vpn_key",
          "type": "digitalocean_ssh_key",
          "name": "vpn_key",
          "change": {"actions": ["no-op"], "after": null}
        }
      ]
    }"#;

    #[test]
    fn test_parse_terraform_plan() {
        let plan = Plan::from_terraform_json(PLAN_JSON).unwrap();
        assert!(plan.has_changes);

        let summary = plan.summary();
        assert_eq!(summary.create, 2);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.update + summary.replace + summary.delete, 0);

        let droplet = plan.find_by_type("digitalocean_droplet").unwrap();
        assert_eq!(droplet.after["region"], "lon1");
    }

    #[test]
    fn test_inbound_rules() {
        let plan = Plan::from_terraform_json(PLAN_JSON).unwrap();
        let rules = plan.inbound_rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0], ("TCP".to_string(), "22".to_string(), vec!["0.0.0.0/0".to_string()]));
        assert_eq!(rules[1].2.len(), 2);
    }

    #[test]
    fn test_action_type_mapping() {
        let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        assert_eq!(ActionType::from_terraform(&s(&["create"])), ActionType::Create);
        assert_eq!(ActionType::from_terraform(&s(&["delete", "create"])), ActionType::Replace);
        assert_eq!(ActionType::from_terraform(&s(&["update"])), ActionType::Update);
        assert_eq!(ActionType::from_terraform(&s(&["delete"])), ActionType::Delete);
        assert_eq!(ActionType::from_terraform(&s(&["read"])), ActionType::NoOp);
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::from_terraform_json(r#"{"format_version": "1.2"}"#).unwrap();
        assert!(!plan.has_changes);
        assert_eq!(plan.summary().to_string(), "0 to create, 0 to update, 0 to replace, 0 to delete, 0 unchanged");
        assert!(Plan::empty().actions.is_empty());
    }
}
