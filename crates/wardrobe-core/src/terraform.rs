//! Terraform driver
//!
//! Each subcommand is a separate invocation with its own timeout. Values are
//! only ever read from `-json` output.

use crate::credentials::CredentialEnv;
use crate::error::{ProvisionError, Result, TerraformStep};
use crate::runner::{CommandSpec, ProcessResult, ProcessRunner};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use wardrobe_cloud::Plan;
use wardrobe_config::TerraformSettings;

/// Values from `terraform output -json`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerraformOutputs {
    values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawOutput {
    value: serde_json::Value,
}

impl TerraformOutputs {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawOutput> = serde_json::from_str(json)?;
        Ok(Self {
            values: raw.into_iter().map(|(k, v)| (k, v.value)).collect(),
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// String value of an output; numbers are rendered as strings
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.values.get(name)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn require_string(&self, name: &str) -> Result<String> {
        self.get_string(name)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProvisionError::MissingOutput(name.to_string()))
    }
}

/// Infrastructure tool lifecycle
///
/// Every call receives the scoped credential environment; implementations
/// must not retain it.
#[async_trait]
pub trait InfraTool: Send + Sync {
    async fn init(&self, workdir: &Path, env: &CredentialEnv) -> Result<()>;

    /// Write a saved plan to `plan_file`
    async fn plan(&self, workdir: &Path, env: &CredentialEnv, plan_file: &Path) -> Result<()>;

    /// Machine-readable view of a saved plan
    async fn show(&self, workdir: &Path, env: &CredentialEnv, plan_file: &Path) -> Result<Plan>;

    /// Apply exactly the saved plan
    async fn apply(&self, workdir: &Path, env: &CredentialEnv, plan_file: &Path) -> Result<()>;

    async fn output(&self, workdir: &Path, env: &CredentialEnv) -> Result<TerraformOutputs>;

    /// Bring an existing remote resource under this configuration
    async fn import(
        &self,
        workdir: &Path,
        env: &CredentialEnv,
        address: &str,
        remote_id: &str,
    ) -> Result<()>;

    async fn destroy(&self, workdir: &Path, env: &CredentialEnv) -> Result<()>;
}

/// The `terraform` CLI
pub struct Terraform {
    binary: String,
    runner: ProcessRunner,
    settings: TerraformSettings,
}

impl Terraform {
    pub fn new(settings: &TerraformSettings) -> Self {
        Self {
            binary: settings.binary.clone(),
            runner: ProcessRunner::new(settings.kill_grace()),
            settings: settings.clone(),
        }
    }

    /// `terraform version -json`, without credentials
    pub async fn version(&self, workdir: &Path) -> Result<String> {
        let spec = CommandSpec::new(&self.binary).args(["version", "-json"]);
        let result = self
            .runner
            .run(&spec, workdir, std::iter::empty(), self.settings.output_timeout())
            .await?;
        let value: serde_json::Value = serde_json::from_str(&result.stdout)?;
        Ok(value
            .get("terraform_version")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }

    async fn run(
        &self,
        step: TerraformStep,
        args: Vec<String>,
        workdir: &Path,
        env: &CredentialEnv,
        timeout: Duration,
    ) -> Result<ProcessResult> {
        let spec = CommandSpec::new(&self.binary).args(args);
        let env = env.iter().chain([("TF_IN_AUTOMATION", "1")]);
        self.runner
            .run(&spec, workdir, env, timeout)
            .await
            .map_err(|e| e.during(step))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl InfraTool for Terraform {
    async fn init(&self, workdir: &Path, env: &CredentialEnv) -> Result<()> {
        let args = vec!["init", "-input=false", "-no-color", "-upgrade"];
        self.run(
            TerraformStep::Init,
            args.into_iter().map(String::from).collect(),
            workdir,
            env,
            self.settings.init_timeout(),
        )
        .await?;
        Ok(())
    }

    async fn plan(&self, workdir: &Path, env: &CredentialEnv, plan_file: &Path) -> Result<()> {
        let args = vec![
            "plan".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
            format!("-out={}", path_arg(plan_file)),
        ];
        self.run(
            TerraformStep::Plan,
            args,
            workdir,
            env,
            self.settings.plan_timeout(),
        )
        .await?;
        Ok(())
    }

    async fn show(&self, workdir: &Path, env: &CredentialEnv, plan_file: &Path) -> Result<Plan> {
        let args = vec![
            "show".to_string(),
            "-json".to_string(),
            "-no-color".to_string(),
            path_arg(plan_file),
        ];
        let result = self
            .run(
                TerraformStep::Show,
                args,
                workdir,
                env,
                self.settings.output_timeout(),
            )
            .await?;
        Plan::from_terraform_json(&result.stdout)
            .map_err(|e| ProvisionError::from(e).during(TerraformStep::Show))
    }

    async fn apply(&self, workdir: &Path, env: &CredentialEnv, plan_file: &Path) -> Result<()> {
        let args = vec![
            "apply".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
            path_arg(plan_file),
        ];
        self.run(
            TerraformStep::Apply,
            args,
            workdir,
            env,
            self.settings.apply_timeout(),
        )
        .await?;
        Ok(())
    }

    async fn output(&self, workdir: &Path, env: &CredentialEnv) -> Result<TerraformOutputs> {
        let args = vec!["output".to_string(), "-json".to_string()];
        let result = self
            .run(
                TerraformStep::Output,
                args,
                workdir,
                env,
                self.settings.output_timeout(),
            )
            .await?;
        TerraformOutputs::from_json(&result.stdout).map_err(|e| e.during(TerraformStep::Output))
    }

    async fn import(
        &self,
        workdir: &Path,
        env: &CredentialEnv,
        address: &str,
        remote_id: &str,
    ) -> Result<()> {
        let args = vec![
            "import".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
            address.to_string(),
            remote_id.to_string(),
        ];
        self.run(
            TerraformStep::Import,
            args,
            workdir,
            env,
            self.settings.plan_timeout(),
        )
        .await?;
        Ok(())
    }

    async fn destroy(&self, workdir: &Path, env: &CredentialEnv) -> Result<()> {
        let args = vec![
            "destroy".to_string(),
            "-auto-approve".to_string(),
            "-input=false".to_string(),
            "-no-color".to_string(),
        ];
        self.run(
            TerraformStep::Destroy,
            args,
            workdir,
            env,
            self.settings.destroy_timeout(),
        )
        .await?;
        Ok(())
    }
}
