use colored::Colorize;
use wardrobe_cloud_digitalocean::REGIONS;
use wardrobe_config::Settings;

pub fn handle(settings: &Settings) {
    println!("{}", "Available regions:".bold());
    for region in REGIONS {
        let marker = if region.slug == settings.region {
            " (default)".green().to_string()
        } else {
            String::new()
        };
        println!("  {:<6} {}{}", region.slug.cyan(), region.label, marker);
    }
}
