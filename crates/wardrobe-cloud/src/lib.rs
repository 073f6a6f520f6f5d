//! Wardrobe Cloud Infrastructure
//!
//! Provider abstraction for Wardrobe: the read-only inventory model used to
//! detect existing deployments, and the plan model used to summarise what
//! Terraform is about to change.
//!
//! # Supported Providers
//!
//! - **DigitalOcean**: droplets, firewalls, SSH keys (read via the REST API,
//!   mutated only by Terraform)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 wardrobe CLI                     │
//! │           (wardrobe deploy / destroy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                wardrobe-core                     │
//! │   orchestrator ─ terraform ─ artifacts           │
//! └───────┬─────────────────────────────────────────┘
//!         │ trait InventoryScanner
//! ┌───────▼─────────────────────────────────────────┐
//! │               wardrobe-cloud                     │
//! │   inventory model · plan model · CloudError      │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────┐
//! │ digitalocean  │
//! │   scanner     │
//! └───────────────┘
//! ```

pub mod error;
pub mod inventory;
pub mod plan;
pub mod provider;

// Re-exports
pub use error::{CloudError, Result};
pub use inventory::{RemoteResource, ResourceInventory, ResourceKind, TagNamespace};
pub use plan::{Action, ActionType, Plan, PlanSummary};
pub use provider::{AuthStatus, InventoryScanner};
