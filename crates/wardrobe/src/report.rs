//! Terminal output

use colored::Colorize;
use wardrobe_cloud::{ResourceInventory, ResourceKind};
use wardrobe_cloud_digitalocean::find_region;
use wardrobe_config::ConfigError;
use wardrobe_core::{
    ConfirmationSummary, Credentials, DeploymentIntent, DeploymentResult, Operation,
    ProvisionError, TOKEN_ENV, TeardownResult,
};

pub fn print_intent(intent: &DeploymentIntent, credentials: &Credentials) {
    println!("{}", "Deployment".bold());
    println!("  Name:      {}", intent.name.cyan());
    println!("  Region:    {}", region_label(&intent.region));
    println!("  Size:      {}", intent.size);
    println!("  Image:     {}", intent.image);
    println!(
        "  SSH key:   {} ({})",
        intent.ssh_public_key_path.display(),
        intent.public_key.fingerprint()
    );
    println!("  Token:     {}", credentials.masked().dimmed());
    println!();
}

pub fn print_confirmation(summary: &ConfirmationSummary) {
    println!();
    match summary.operation {
        Operation::Deploy => {
            println!("{}", "The following resources will be created:".bold());
            println!(
                "  • droplet   {} ({}, {}, {})",
                summary.droplet_name.cyan(),
                region_label(&summary.region),
                summary.size,
                summary.image
            );
            println!("  • firewall  {}-fw", summary.droplet_name);
            match &summary.registered_key {
                Some(name) => println!(
                    "  • ssh key   existing '{}' ({}), not recreated",
                    name, summary.ssh_key_fingerprint
                ),
                None => println!(
                    "  • ssh key   {}-key ({})",
                    summary.droplet_name, summary.ssh_key_fingerprint
                ),
            }
            println!("  All tagged {}", summary.namespace.yellow());
            println!();
            println!("{}", "Inbound firewall rules:".bold());
            for rule in &summary.firewall_rules {
                println!("  • {}", rule);
            }
        }
        Operation::Destroy => {
            println!("{}", "The following resources will be destroyed:".bold());
            for resource in &summary.resources {
                println!("  • {}", resource.to_string().red());
            }
        }
    }
    println!();
    println!(
        "  Terraform files: {}",
        summary.artifact_dir.display().to_string().dimmed()
    );
    println!();
}

pub fn print_deployment(result: &DeploymentResult) {
    println!();
    println!("{}", "✓ VPN server deployed".green().bold());
    println!();
    println!("  Droplet:   {}", result.droplet_name.cyan());
    println!("  IP:        {}", result.droplet_ip.cyan());
    if let Some(id) = &result.droplet_id {
        println!("  ID:        {}", id);
    }
    println!("  SSH key:   {}", result.ssh_key_fingerprint);
    println!("  Admin UI:  {}", result.admin_url.cyan().underline());
    println!("  Plan:      {}", result.plan_summary);

    if result.admin_ui_reachable {
        println!("  Status:    {}", "admin UI is up".green());
    }
    for warning in &result.warnings {
        println!();
        println!("{} {}", "⚠".yellow(), warning.to_string().yellow());
    }

    println!();
    println!("{}", "Next steps".bold());
    println!(
        "  1. Open {} and create the admin account",
        result.admin_url.cyan()
    );
    println!("  2. Add a client and scan its QR code with the WireGuard app");
    println!("  3. SSH access: ssh root@{}", result.droplet_ip);
    println!();
    println!("{}", "Security notes".bold());
    println!("  • The admin UI only accepts connections from your current IP and the VPN subnet.");
    println!("    If your IP changes, redeploy or reach it through the VPN.");
    println!("  • The admin UI is served over plain HTTP; prefer using it over the VPN.");
    println!(
        "  • Remove everything with {}",
        "wardrobe destroy".cyan()
    );
}

pub fn print_teardown(name: &str, result: &TeardownResult) {
    println!();
    if result.nothing_to_destroy() {
        println!(
            "{}",
            format!("Nothing to destroy for '{}'.", name).yellow()
        );
        return;
    }
    for resource in &result.destroyed {
        println!("  {} {}", "✓".green(), resource);
    }
    for resource in &result.skipped {
        println!("  {} {} (not destroyed)", "⚠".yellow(), resource);
    }
    println!();
    if result.skipped.is_empty() {
        println!("{}", format!("✓ '{}' destroyed", name).green().bold());
    } else {
        println!(
            "{}",
            "Some resources were left in place; remove them from the DigitalOcean control panel."
                .yellow()
        );
    }
}

pub fn print_inventory(namespace: &str, inventory: &ResourceInventory) {
    if inventory.is_empty() {
        println!(
            "{}",
            format!("No resources tagged '{}'.", namespace).dimmed()
        );
        return;
    }

    for kind in ResourceKind::ALL {
        let resources = inventory.by_kind(kind);
        if resources.is_empty() {
            continue;
        }
        println!("{}", kind_heading(kind).bold());
        for resource in resources {
            let mut line = format!("  • {} (id: {})", resource.name.cyan(), resource.remote_id);
            if let Some(ip) = &resource.ipv4 {
                line.push_str(&format!("  {}", ip));
            }
            if let Some(region) = &resource.region {
                line.push_str(&format!("  {}", region));
            }
            if let Some(status) = &resource.status {
                line.push_str(&format!("  [{}]", status));
            }
            if let Some(created) = &resource.created_at {
                line.push_str(&format!("  created {}", created.format("%Y-%m-%d %H:%M UTC")));
            }
            println!("{}", line);
        }
    }
}

pub fn print_error(error: &anyhow::Error) {
    eprintln!();
    eprintln!("{} {}", "Error:".red().bold(), error);

    if let Some(e) = error.downcast_ref::<ProvisionError>() {
        match e {
            ProvisionError::UserDeclined => {
                eprintln!("{}", "Nothing was created or changed.".dimmed());
            }
            ProvisionError::DuplicateResource { .. } => {
                eprintln!();
                eprintln!("Inspect them with {}", "wardrobe status".cyan());
            }
            ProvisionError::ApplyFailed { .. } => {
                eprintln!();
                eprintln!(
                    "{}",
                    "Terraform may have created some resources before failing.".yellow()
                );
                eprintln!(
                    "Inspect with {} and remove with {}",
                    "wardrobe status".cyan(),
                    "wardrobe destroy".cyan()
                );
            }
            ProvisionError::TerraformFailed { .. } => {
                eprintln!();
                eprintln!(
                    "{}",
                    "Terraform stopped before creating anything; it is safe to retry.".dimmed()
                );
            }
            ProvisionError::MissingCredential(what) if what.contains(TOKEN_ENV) => {
                eprintln!();
                eprintln!(
                    "Create a token at https://cloud.digitalocean.com/account/api/tokens and export it:"
                );
                eprintln!("  export DIGITALOCEAN_TOKEN=dop_v1_...");
            }
            ProvisionError::ToolNotFound(tool) if tool.contains("terraform") => {
                eprintln!();
                eprintln!("Install Terraform: https://developer.hashicorp.com/terraform/install");
            }
            _ => {}
        }
    } else if let Some(ConfigError::InvalidSettings { path, .. }) =
        error.downcast_ref::<ConfigError>()
    {
        eprintln!("Fix or remove {}", path.display());
    }
}

fn kind_heading(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Droplet => "Droplets",
        ResourceKind::Firewall => "Firewalls",
        ResourceKind::SshKey => "SSH keys",
    }
}

pub fn region_label(slug: &str) -> String {
    match find_region(slug) {
        Some(region) => format!("{} ({})", region.slug, region.label),
        None => slug.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_label() {
        assert_eq!(region_label("lon1"), "lon1 (London, UK)");
        assert_eq!(region_label("xyz9"), "xyz9");
    }
}
