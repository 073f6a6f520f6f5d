//! Wardrobe provisioning core
//!
//! Turns a validated [`DeploymentIntent`] into a running WireGuard droplet by
//! generating a Terraform definition and driving the `terraform` CLI through
//! the [`Orchestrator`] state machine.

pub mod artifact;
pub mod credentials;
pub mod error;
pub mod health;
pub mod intent;
pub mod keygen;
pub mod network;
pub mod orchestrator;
pub mod runner;
pub mod terraform;

pub use artifact::{
    ArtifactContents, ArtifactKind, FirewallRule, GeneratedArtifactSet, PLAN_FILE, generate,
    inbound_rules, render, resource_address,
};
pub use credentials::{
    CredentialEnv, Credentials, TF_TOKEN_ENV, TOKEN_ENV, mask_token, with_credentials,
};
pub use error::{ProvisionError, Result, TerraformStep};
pub use health::{HealthCheck, HttpHealthPoller};
pub use intent::{DeploymentIntent, FirewallPolicy, IntentParams, RegisteredKey};
pub use keygen::KeyGenerator;
pub use network::{ContextResolver, HttpContextResolver, NetworkContext};
pub use orchestrator::{
    ConfirmationGate, ConfirmationSummary, DeploymentResult, DeploymentWarning, NoopObserver,
    Operation, Orchestrator, OrchestratorOptions, ProvisionObserver, Stage, TeardownResult,
};
pub use runner::{CommandSpec, ProcessResult, ProcessRunner};
pub use terraform::{InfraTool, Terraform, TerraformOutputs};
