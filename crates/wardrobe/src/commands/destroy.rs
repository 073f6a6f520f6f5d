use super::TargetArgs;
use crate::{progress::CliObserver, prompt, report, utils};
use colored::Colorize;
use wardrobe_cloud_digitalocean::DigitalOceanProvider;
use wardrobe_config::Settings;
use wardrobe_core::{
    Credentials, DeploymentIntent, HttpContextResolver, HttpHealthPoller, Orchestrator,
    OrchestratorOptions, Terraform,
};

pub async fn handle(
    settings: &Settings,
    credentials: &Credentials,
    target: TargetArgs,
    yes: bool,
) -> anyhow::Result<()> {
    credentials.ensure_present()?;

    let params = utils::intent_params(settings, &target, None, None);
    let intent = DeploymentIntent::validate(params)?;

    println!(
        "{}",
        format!("Destroying Wardrobe VPN server '{}'...", intent.name)
            .blue()
            .bold()
    );
    println!();

    let terraform = Terraform::new(&settings.terraform);
    let scanner = DigitalOceanProvider::new(
        credentials.token(),
        &settings.provider.api_base_url,
        settings.provider.request_timeout(),
    )?;
    let resolver = HttpContextResolver::from_settings(&settings.network)?;
    let health = HttpHealthPoller::new(settings.health.request_timeout())?;
    let gate = prompt::gate(yes);
    let observer = CliObserver::default();

    let mut orchestrator = Orchestrator::new(&scanner, &resolver, &terraform, &health, gate.as_ref())
        .with_observer(&observer)
        .with_options(OrchestratorOptions::from_settings(settings));

    let outcome = orchestrator.teardown(&intent, credentials).await;
    observer.stop();

    let result = outcome?;
    report::print_teardown(&intent.name, &result);
    Ok(())
}
