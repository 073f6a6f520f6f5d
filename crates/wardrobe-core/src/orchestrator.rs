//! Provisioning orchestrator
//!
//! Drives one deployment (or teardown) through a strictly sequential state
//! machine:
//!
//! ```text
//! INIT → PRECHECK ─┬─ DUPLICATE_FOUND
//!                  └─ CONTEXT → GENERATE → CONFIRM ─┬─ USER_DECLINED ─┐
//!                                                   └─ APPLY ─┬─ PLAN_FAILED ──┤
//!                                                             ├─ APPLY_FAILED ─┤
//!                                                             └─ VERIFY → REPORT ─┴─ CLEANUP → DONE
//! ```
//!
//! Nothing remote is touched before CONFIRM. A failure in `init`, `plan` or
//! `show` ends in PLAN_FAILED; from `apply` on it ends in APPLY_FAILED. The generated artifact set is
//! removed at CLEANUP on every path that reached GENERATE, and on drop if the
//! workflow future itself is cancelled. Terraform is never asked to destroy
//! anything after a failed apply.

use crate::artifact::{self, FirewallRule, GeneratedArtifactSet, resource_address};
use crate::credentials::{Credentials, with_credentials};
use crate::error::{ProvisionError, Result, TerraformStep};
use crate::health::HealthCheck;
use crate::intent::{DeploymentIntent, RegisteredKey};
use crate::network::{ContextResolver, NetworkContext};
use crate::terraform::InfraTool;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use wardrobe_cloud::{InventoryScanner, Plan, PlanSummary, RemoteResource};
use wardrobe_config::Settings;

/// Workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Precheck,
    DuplicateFound,
    Context,
    Generate,
    Confirm,
    UserDeclined,
    Apply,
    Destroy,
    /// Terraform failed before anything remote was changed
    PlanFailed,
    ApplyFailed,
    Verify,
    Report,
    Cleanup,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "INIT",
            Stage::Precheck => "PRECHECK",
            Stage::DuplicateFound => "DUPLICATE_FOUND",
            Stage::Context => "CONTEXT",
            Stage::Generate => "GENERATE",
            Stage::Confirm => "CONFIRM",
            Stage::UserDeclined => "USER_DECLINED",
            Stage::Apply => "APPLY",
            Stage::Destroy => "DESTROY",
            Stage::PlanFailed => "PLAN_FAILED",
            Stage::ApplyFailed => "APPLY_FAILED",
            Stage::Verify => "VERIFY",
            Stage::Report => "REPORT",
            Stage::Cleanup => "CLEANUP",
            Stage::Done => "DONE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deploy,
    Destroy,
}

/// What the operator is asked to approve at CONFIRM
#[derive(Debug, Clone)]
pub struct ConfirmationSummary {
    pub operation: Operation,
    pub droplet_name: String,
    pub namespace: String,
    pub region: String,
    pub size: String,
    pub image: String,
    pub ssh_key_fingerprint: String,
    /// Name of the existing account key the droplet will use, if any
    pub registered_key: Option<String>,
    pub firewall_rules: Vec<FirewallRule>,
    /// Remote resources that will be destroyed (teardown only)
    pub resources: Vec<RemoteResource>,
    pub artifact_dir: PathBuf,
}

impl ConfirmationSummary {
    fn new(
        operation: Operation,
        intent: &DeploymentIntent,
        context: &NetworkContext,
        artifacts: &GeneratedArtifactSet,
        resources: Vec<RemoteResource>,
    ) -> Self {
        Self {
            operation,
            droplet_name: intent.name.clone(),
            namespace: intent.namespace.to_string(),
            region: intent.region.clone(),
            size: intent.size.clone(),
            image: intent.image.clone(),
            ssh_key_fingerprint: intent.public_key.fingerprint(),
            registered_key: intent.registered_key.as_ref().map(|k| k.name.clone()),
            firewall_rules: artifact::inbound_rules(intent, context),
            resources,
            artifact_dir: artifacts.path().to_path_buf(),
        }
    }
}

/// Blocking human approval
///
/// Only an explicit affirmative answer may return `true`.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, summary: &ConfirmationSummary) -> bool;
}

/// Progress hooks for the presentation layer
pub trait ProvisionObserver: Send + Sync {
    fn stage_entered(&self, _stage: Stage) {}

    /// Called with the saved plan before it is applied
    fn plan_ready(&self, _plan: &Plan) {}

    fn health_wait(&self, _url: &str, _timeout: Duration) {}
}

/// Observer that ignores every event
pub struct NoopObserver;

impl ProvisionObserver for NoopObserver {}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Parent directory for the `wardrobe-*` artifact directory
    pub artifact_parent: Option<PathBuf>,
    pub health_interval: Duration,
    pub health_timeout: Duration,
}

impl OrchestratorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            artifact_parent: None,
            health_interval: settings.health.interval(),
            health_timeout: settings.health.timeout(),
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Non-fatal findings attached to a successful deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentWarning {
    /// The admin UI did not answer within the poll window
    HealthCheckTimeout { url: String, waited: Duration },
}

impl std::fmt::Display for DeploymentWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentWarning::HealthCheckTimeout { url, waited } => write!(
                f,
                "Admin UI at {} not reachable after {}s; it may still be starting",
                url,
                waited.as_secs()
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentResult {
    pub droplet_name: String,
    pub droplet_ip: String,
    pub droplet_id: Option<String>,
    pub admin_url: String,
    pub admin_ui_reachable: bool,
    pub ssh_key_fingerprint: String,
    pub applied: bool,
    pub plan_summary: PlanSummary,
    pub warnings: Vec<DeploymentWarning>,
}

#[derive(Debug, Clone, Default)]
pub struct TeardownResult {
    pub destroyed: Vec<RemoteResource>,
    /// Resources that matched but could not be brought under Terraform
    pub skipped: Vec<RemoteResource>,
}

impl TeardownResult {
    pub fn nothing_to_destroy(&self) -> bool {
        self.destroyed.is_empty() && self.skipped.is_empty()
    }
}

struct Applied {
    plan: PlanSummary,
    droplet_ip: String,
    droplet_id: Option<String>,
    fingerprint: Option<String>,
}

/// The provisioning workflow
pub struct Orchestrator<'a> {
    scanner: &'a dyn InventoryScanner,
    resolver: &'a dyn ContextResolver,
    infra: &'a dyn InfraTool,
    health: &'a dyn HealthCheck,
    gate: &'a dyn ConfirmationGate,
    observer: &'a dyn ProvisionObserver,
    options: OrchestratorOptions,
    trace: Vec<Stage>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        scanner: &'a dyn InventoryScanner,
        resolver: &'a dyn ContextResolver,
        infra: &'a dyn InfraTool,
        health: &'a dyn HealthCheck,
        gate: &'a dyn ConfirmationGate,
    ) -> Self {
        Self {
            scanner,
            resolver,
            infra,
            health,
            gate,
            observer: &NoopObserver,
            options: OrchestratorOptions::default(),
            trace: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: &'a dyn ProvisionObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// States visited by the most recent run
    pub fn trace(&self) -> &[Stage] {
        &self.trace
    }

    fn enter(&mut self, stage: Stage) {
        tracing::info!(stage = %stage, "Entering stage");
        self.trace.push(stage);
        self.observer.stage_entered(stage);
    }

    /// Provision one VPN droplet
    pub async fn deploy(
        &mut self,
        intent: &DeploymentIntent,
        credentials: &Credentials,
    ) -> Result<DeploymentResult> {
        self.trace.clear();
        self.enter(Stage::Init);
        credentials.ensure_present()?;

        self.enter(Stage::Precheck);
        let inventory = self.scanner.scan(&intent.namespace).await?;
        if !inventory.is_empty() {
            self.enter(Stage::DuplicateFound);
            return Err(ProvisionError::DuplicateResource {
                namespace: intent.namespace.to_string(),
                resources: inventory.iter().map(|r| r.to_string()).collect(),
            });
        }

        // A key registered under another name cannot be registered twice
        let fingerprint = intent.public_key.fingerprint();
        let with_registered_key;
        let intent = match self.scanner.find_ssh_key(&fingerprint).await? {
            Some(key) => {
                tracing::info!("SSH key {} already on the account as '{}'", fingerprint, key.name);
                with_registered_key = intent.clone().with_registered_key(RegisteredKey {
                    id: key.remote_id,
                    name: key.name,
                    fingerprint,
                });
                &with_registered_key
            }
            None => intent,
        };

        self.enter(Stage::Context);
        let context = self.resolver.resolve().await?;
        tracing::info!("Admin UI will be restricted to {}", context.admin_source());

        self.enter(Stage::Generate);
        let artifacts =
            artifact::generate(intent, &context, self.options.artifact_parent.as_deref())?;

        let outcome = self
            .confirm_and_apply(intent, &context, &artifacts, credentials)
            .await;
        self.finish(artifacts, outcome)
    }

    async fn confirm_and_apply(
        &mut self,
        intent: &DeploymentIntent,
        context: &NetworkContext,
        artifacts: &GeneratedArtifactSet,
        credentials: &Credentials,
    ) -> Result<DeploymentResult> {
        self.enter(Stage::Confirm);
        let summary =
            ConfirmationSummary::new(Operation::Deploy, intent, context, artifacts, Vec::new());
        if !self.gate.confirm(&summary).await {
            self.enter(Stage::UserDeclined);
            return Err(ProvisionError::UserDeclined);
        }

        self.enter(Stage::Apply);
        let infra = self.infra;
        let observer = self.observer;
        let workdir = artifacts.path();
        let plan_file = artifacts.plan_file();

        let applied = with_credentials(credentials, async |env| {
            infra
                .init(workdir, env)
                .await
                .map_err(|e| e.during(TerraformStep::Init))?;
            infra
                .plan(workdir, env, &plan_file)
                .await
                .map_err(|e| e.during(TerraformStep::Plan))?;
            let plan = infra
                .show(workdir, env, &plan_file)
                .await
                .map_err(|e| e.during(TerraformStep::Show))?;
            tracing::info!("Terraform plan: {}", plan.summary());
            observer.plan_ready(&plan);

            infra
                .apply(workdir, env, &plan_file)
                .await
                .map_err(|e| e.during(TerraformStep::Apply))?;

            let outputs = infra
                .output(workdir, env)
                .await
                .map_err(|e| e.during(TerraformStep::Output))?;
            let droplet_ip = outputs
                .require_string("droplet_ip")
                .map_err(|e| e.during(TerraformStep::Output))?;

            Ok(Applied {
                plan: plan.summary(),
                droplet_ip,
                droplet_id: outputs.get_string("droplet_id"),
                fingerprint: outputs.get_string("ssh_key_fingerprint"),
            })
        })
        .await;

        let applied = match applied {
            Ok(applied) => applied,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };

        self.enter(Stage::Verify);
        let admin_url = format!(
            "http://{}:{}/",
            applied.droplet_ip, intent.firewall.admin_port
        );
        let timeout = self.options.health_timeout;
        self.observer.health_wait(&admin_url, timeout);
        let reachable = self
            .health
            .poll_until_ready(&admin_url, self.options.health_interval, timeout)
            .await;

        let mut warnings = Vec::new();
        if !reachable {
            let warning = DeploymentWarning::HealthCheckTimeout {
                url: admin_url.clone(),
                waited: timeout,
            };
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        self.enter(Stage::Report);
        Ok(DeploymentResult {
            droplet_name: intent.name.clone(),
            droplet_ip: applied.droplet_ip,
            droplet_id: applied.droplet_id,
            admin_url,
            admin_ui_reachable: reachable,
            ssh_key_fingerprint: applied
                .fingerprint
                .unwrap_or_else(|| intent.public_key.fingerprint()),
            applied: true,
            plan_summary: applied.plan,
            warnings,
        })
    }

    /// Destroy the resources of one deployment through Terraform
    ///
    /// Matching remote resources are imported into a freshly generated
    /// definition and then destroyed; no local state is needed.
    pub async fn teardown(
        &mut self,
        intent: &DeploymentIntent,
        credentials: &Credentials,
    ) -> Result<TeardownResult> {
        self.trace.clear();
        self.enter(Stage::Init);
        credentials.ensure_present()?;

        self.enter(Stage::Precheck);
        let inventory = self.scanner.scan(&intent.namespace).await?;
        let targets: Vec<RemoteResource> = inventory
            .for_deployment(&intent.name)
            .into_iter()
            .cloned()
            .collect();
        if targets.is_empty() {
            tracing::info!("Nothing to destroy for '{}'", intent.name);
            self.enter(Stage::Done);
            return Ok(TeardownResult::default());
        }

        // One Terraform address per kind; any extra match is left alone
        let mut managed: Vec<RemoteResource> = Vec::new();
        let mut skipped: Vec<RemoteResource> = Vec::new();
        for resource in targets {
            if managed.iter().any(|m| m.kind == resource.kind) {
                tracing::warn!("Not managing duplicate {}", resource);
                skipped.push(resource);
            } else {
                managed.push(resource);
            }
        }
        managed.sort_by_key(|r| r.kind);

        self.enter(Stage::Context);
        let context = self.resolver.resolve().await?;

        self.enter(Stage::Generate);
        let artifacts =
            artifact::generate(intent, &context, self.options.artifact_parent.as_deref())?;

        let outcome = self
            .confirm_and_destroy(intent, &context, &artifacts, credentials, managed, skipped)
            .await;
        self.finish(artifacts, outcome)
    }

    async fn confirm_and_destroy(
        &mut self,
        intent: &DeploymentIntent,
        context: &NetworkContext,
        artifacts: &GeneratedArtifactSet,
        credentials: &Credentials,
        managed: Vec<RemoteResource>,
        mut skipped: Vec<RemoteResource>,
    ) -> Result<TeardownResult> {
        self.enter(Stage::Confirm);
        let summary = ConfirmationSummary::new(
            Operation::Destroy,
            intent,
            context,
            artifacts,
            managed.iter().chain(skipped.iter()).cloned().collect(),
        );
        if !self.gate.confirm(&summary).await {
            self.enter(Stage::UserDeclined);
            return Err(ProvisionError::UserDeclined);
        }

        self.enter(Stage::Destroy);
        let infra = self.infra;
        let workdir = artifacts.path();

        let destroyed = with_credentials(credentials, async |env| {
            infra
                .init(workdir, env)
                .await
                .map_err(|e| e.during(TerraformStep::Init))?;

            let mut imported = Vec::new();
            let mut failed = Vec::new();
            let mut last_error = None;
            for resource in managed {
                let address = resource_address(resource.kind);
                match infra
                    .import(workdir, env, address, &resource.remote_id)
                    .await
                {
                    Ok(()) => imported.push(resource),
                    Err(e) => {
                        tracing::warn!("Could not import {}: {}", resource, e);
                        failed.push(resource);
                        last_error = Some(e);
                    }
                }
            }

            if imported.is_empty() {
                let error = last_error.unwrap_or_else(|| {
                    ProvisionError::MissingOutput("no resources were imported".to_string())
                });
                return Err(error.during(TerraformStep::Import));
            }

            infra
                .destroy(workdir, env)
                .await
                .map_err(|e| e.during(TerraformStep::Destroy))?;
            Ok((imported, failed))
        })
        .await;

        match destroyed {
            Ok((destroyed, failed)) => {
                skipped.extend(failed);
                self.enter(Stage::Report);
                Ok(TeardownResult { destroyed, skipped })
            }
            Err(e) => {
                self.record_failure(&e);
                Err(e)
            }
        }
    }

    fn record_failure(&mut self, error: &ProvisionError) {
        match error {
            ProvisionError::ApplyFailed { .. } => self.enter(Stage::ApplyFailed),
            ProvisionError::TerraformFailed { .. } => self.enter(Stage::PlanFailed),
            _ => return,
        }
        tracing::error!("{}", error);
    }

    fn finish<T>(&mut self, artifacts: GeneratedArtifactSet, outcome: Result<T>) -> Result<T> {
        self.enter(Stage::Cleanup);
        if let Err(e) = artifacts.cleanup() {
            tracing::warn!("Failed to remove generated artifacts: {}", e);
        }
        if outcome.is_ok() {
            self.enter(Stage::Done);
        }
        outcome
    }
}
