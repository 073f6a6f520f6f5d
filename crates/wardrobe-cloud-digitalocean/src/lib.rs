//! DigitalOcean provider for Wardrobe
//!
//! This crate implements the [`InventoryScanner`](wardrobe_cloud::InventoryScanner)
//! trait for DigitalOcean, using the REST API strictly read-only.
//!
//! # Features
//!
//! - Droplet, firewall and SSH key inventory (paginated)
//! - Token check via the account endpoint
//! - Region catalogue
//! - OpenSSH public key validation and MD5 fingerprints
//!
//! # Example
//!
//! ```ignore
//! use wardrobe_cloud::{InventoryScanner, TagNamespace};
//! use wardrobe_cloud_digitalocean::{DigitalOceanProvider, DIGITALOCEAN_API_BASE};
//!
//! let provider = DigitalOceanProvider::new(token, DIGITALOCEAN_API_BASE, timeout)?;
//!
//! let auth = provider.check_auth().await?;
//! let inventory = provider.scan(&TagNamespace::new("wardrobe-vpn")).await?;
//! ```

pub mod client;
pub mod error;
pub mod provider;
pub mod regions;
pub mod ssh_key;

pub use client::{DIGITALOCEAN_API_BASE, DigitalOceanClient};
pub use error::{DigitalOceanError, Result};
pub use provider::DigitalOceanProvider;
pub use regions::{REGIONS, Region, find_region, is_known_region};
pub use ssh_key::PublicKey;
