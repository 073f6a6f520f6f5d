use crate::report;
use colored::Colorize;
use wardrobe_cloud::{InventoryScanner, TagNamespace};
use wardrobe_cloud_digitalocean::DigitalOceanProvider;
use wardrobe_config::Settings;
use wardrobe_core::{Credentials, ProvisionError};

pub async fn handle(settings: &Settings, credentials: &Credentials) -> anyhow::Result<()> {
    credentials.ensure_present()?;

    let provider = DigitalOceanProvider::new(
        credentials.token(),
        &settings.provider.api_base_url,
        settings.provider.request_timeout(),
    )?;

    let auth = provider
        .check_auth()
        .await
        .map_err(ProvisionError::from)?;
    if !auth.authenticated {
        return Err(ProvisionError::AuthError(auth.error.unwrap_or_default()).into());
    }
    if let Some(account) = &auth.account_info {
        println!("Account: {}", account.cyan());
    }
    if !credentials.has_expected_format() {
        println!(
            "{}",
            "⚠ The token does not look like a DigitalOcean personal access token".yellow()
        );
    }
    println!();

    let namespace = TagNamespace::new(&settings.namespace);
    let inventory = provider
        .scan(&namespace)
        .await
        .map_err(ProvisionError::from)?;
    report::print_inventory(namespace.tag(), &inventory);
    Ok(())
}
