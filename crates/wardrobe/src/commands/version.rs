use colored::Colorize;
use wardrobe_config::Settings;
use wardrobe_core::Terraform;

pub async fn handle() {
    println!("wardrobe {}", env!("CARGO_PKG_VERSION"));

    let settings = wardrobe_config::load_settings().unwrap_or_else(|_| Settings::default());
    match Terraform::new(&settings.terraform)
        .version(&std::env::temp_dir())
        .await
    {
        Ok(version) => println!("terraform {}", version),
        Err(e) => {
            tracing::debug!("terraform version failed: {}", e);
            println!("terraform {}", "not found".yellow());
        }
    }
}
