mod commands;
mod progress;
mod prompt;
mod report;
mod utils;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use wardrobe_config::{ConfigError, Settings};
use wardrobe_core::{Credentials, ProvisionError, TOKEN_ENV};

#[derive(Parser)]
#[command(name = "wardrobe")]
#[command(about = "Your own WireGuard VPN on DigitalOcean, one command away", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to WARDROBE_CONFIG_PATH, ./wardrobe.yaml, ~/.config/wardrobe/wardrobe.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// DigitalOcean API token
    #[arg(
        long = "token",
        env = TOKEN_ENV,
        hide_env_values = true,
        hide = true,
        global = true
    )]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the VPN server
    Deploy {
        #[command(flatten)]
        target: commands::TargetArgs,
        /// Droplet size slug
        #[arg(long, env = "WARDROBE_SIZE")]
        size: Option<String>,
        /// Droplet image slug
        #[arg(long, env = "WARDROBE_IMAGE")]
        image: Option<String>,
        /// Create a new ed25519 key pair (at --ssh-key, or ~/.ssh/id_ed25519) and use it
        #[arg(long)]
        generate_key: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Destroy the VPN server and its firewall and SSH key
    Destroy {
        #[command(flatten)]
        target: commands::TargetArgs,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List resources in the Wardrobe namespace
    Status,
    /// List supported DigitalOcean regions
    Regions,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!(
                "{}",
                "Interrupted. Local artifacts were removed; anything Terraform already created is left in place."
                    .yellow()
            );
            eprintln!("Run {} to check.", "wardrobe status".cyan());
            return ExitCode::from(130);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report::print_error(&e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Commands that need neither settings nor credentials
    match cli.command {
        Commands::Version => {
            commands::version::handle().await;
            return Ok(());
        }
        Commands::Regions => {
            let settings = load_settings(cli.config.as_deref())?;
            commands::regions::handle(&settings);
            return Ok(());
        }
        _ => {}
    }

    let settings = load_settings(cli.config.as_deref())?;
    let credentials = Credentials::new(cli.token.unwrap_or_default());

    match cli.command {
        Commands::Deploy {
            target,
            size,
            image,
            generate_key,
            yes,
        } => {
            let options = commands::deploy::DeployOptions {
                target,
                size,
                image,
                generate_key,
                yes,
            };
            commands::deploy::handle(&settings, &credentials, options).await?;
        }
        Commands::Destroy { target, yes } => {
            commands::destroy::handle(&settings, &credentials, target, yes).await?;
        }
        Commands::Status => {
            commands::status::handle(&settings, &credentials).await?;
        }
        Commands::Version | Commands::Regions => {
            unreachable!("handled before settings are loaded");
        }
    }

    Ok(())
}

fn load_settings(path: Option<&std::path::Path>) -> Result<Settings, ConfigError> {
    match path {
        Some(path) => wardrobe_config::load_settings_from(&utils::expand_home(path)),
        None => wardrobe_config::load_settings(),
    }
}

/// 0 ok, 2 invalid input, 3 duplicate, 4 declined, 5 apply failure,
/// 6 terraform failed before changing anything, 1 other
fn exit_code(error: &anyhow::Error) -> u8 {
    if let Some(e) = error.downcast_ref::<ProvisionError>() {
        return match e {
            ProvisionError::InvalidIntent(_) | ProvisionError::MissingCredential(_) => 2,
            ProvisionError::DuplicateResource { .. } => 3,
            ProvisionError::UserDeclined => 4,
            ProvisionError::ApplyFailed { .. } => 5,
            ProvisionError::TerraformFailed { .. } => 6,
            _ => 1,
        };
    }
    if let Some(e) = error.downcast_ref::<ConfigError>() {
        return match e {
            ConfigError::SettingsFileNotFound(_) | ConfigError::InvalidSettings { .. } => 2,
            _ => 1,
        };
    }
    1
}
