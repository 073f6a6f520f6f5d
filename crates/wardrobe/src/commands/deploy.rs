use super::TargetArgs;
use crate::{progress::CliObserver, prompt, report, utils};
use colored::Colorize;
use wardrobe_cloud_digitalocean::DigitalOceanProvider;
use wardrobe_config::Settings;
use wardrobe_core::{
    Credentials, DeploymentIntent, HttpContextResolver, HttpHealthPoller, KeyGenerator,
    Orchestrator, OrchestratorOptions, ProvisionError, Terraform,
};

pub struct DeployOptions {
    pub target: TargetArgs,
    pub size: Option<String>,
    pub image: Option<String>,
    pub generate_key: bool,
    pub yes: bool,
}

pub async fn handle(
    settings: &Settings,
    credentials: &Credentials,
    options: DeployOptions,
) -> anyhow::Result<()> {
    credentials.ensure_present()?;

    let mut params = utils::intent_params(
        settings,
        &options.target,
        options.size.as_deref(),
        options.image.as_deref(),
    );
    if options.generate_key {
        let requested = options
            .target
            .ssh_key
            .as_deref()
            .or(settings.ssh_key_path.as_deref());
        let private_key = utils::new_key_path(requested).ok_or_else(|| {
            ProvisionError::InvalidIntent(
                "cannot locate the home directory; pass --ssh-key".to_string(),
            )
        })?;
        let public_key = KeyGenerator::new(&settings.keygen)
            .generate(&private_key)
            .await?;
        println!(
            "{} {}",
            "Generated SSH key".green(),
            public_key.display().to_string().cyan()
        );
        params.ssh_public_key_path = Some(public_key);
    }
    let intent = DeploymentIntent::validate(params)?;

    println!("{}", "Deploying a Wardrobe VPN server...".blue().bold());
    println!();
    report::print_intent(&intent, credentials);

    let terraform = Terraform::new(&settings.terraform);
    let version = terraform.version(&std::env::temp_dir()).await?;
    println!("  Terraform {}", version.dimmed());
    println!();

    let scanner = DigitalOceanProvider::new(
        credentials.token(),
        &settings.provider.api_base_url,
        settings.provider.request_timeout(),
    )?;
    let resolver = HttpContextResolver::from_settings(&settings.network)?;
    let health = HttpHealthPoller::new(settings.health.request_timeout())?;
    let gate = prompt::gate(options.yes);
    let observer = CliObserver::default();

    let mut orchestrator = Orchestrator::new(&scanner, &resolver, &terraform, &health, gate.as_ref())
        .with_observer(&observer)
        .with_options(OrchestratorOptions::from_settings(settings));

    let outcome = orchestrator.deploy(&intent, credentials).await;
    observer.stop();
    tracing::debug!(
        "Stages: {}",
        orchestrator
            .trace()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    );

    let result = outcome?;
    report::print_deployment(&result);
    Ok(())
}
