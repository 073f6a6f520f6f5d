//! Provisioning error types

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use wardrobe_cloud::CloudError;

/// Terraform subcommand that was running when a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerraformStep {
    Init,
    Plan,
    Show,
    Apply,
    Output,
    Import,
    Destroy,
}

impl TerraformStep {
    /// Whether remote infrastructure may differ from before once this step
    /// has started (`output` runs after apply, `import` during teardown)
    pub fn touches_remote(&self) -> bool {
        matches!(
            self,
            TerraformStep::Apply
                | TerraformStep::Output
                | TerraformStep::Import
                | TerraformStep::Destroy
        )
    }
}

impl std::fmt::Display for TerraformStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerraformStep::Init => "init",
            TerraformStep::Plan => "plan",
            TerraformStep::Show => "show",
            TerraformStep::Apply => "apply",
            TerraformStep::Output => "output",
            TerraformStep::Import => "import",
            TerraformStep::Destroy => "destroy",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Cloud provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("Cloud provider rejected the credentials: {0}")]
    AuthError(String),

    #[error(
        "Could not determine your public IP address (primary: {primary}; fallback: {fallback}). \
         Refusing to generate an unrestricted admin firewall rule"
    )]
    NetworkContextUnavailable { primary: String, fallback: String },

    #[error("Invalid deployment settings: {0}")]
    InvalidIntent(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error(
        "Existing resources found in namespace '{namespace}': {}. \
         Remove them (or run `wardrobe destroy`) before deploying again",
        .resources.join(", ")
    )]
    DuplicateResource {
        namespace: String,
        resources: Vec<String>,
    },

    #[error("Cancelled by user")]
    UserDeclined,

    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    ProcessTimeout { command: String, timeout: Duration },

    #[error("`{command}` exited with status {exit_code}: {stderr}")]
    ProcessFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("`{0}` not found in PATH. Install it and try again")]
    ToolNotFound(String),

    #[error("terraform {step} failed: {source}\nNo remote resources were changed")]
    TerraformFailed {
        step: TerraformStep,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error(
        "terraform {step} failed: {source}\n\
         Remote resources may already exist. Check your DigitalOcean account before retrying"
    )]
    ApplyFailed {
        step: TerraformStep,
        #[source]
        source: Box<ProvisionError>,
    },

    #[error("Terraform output is missing '{0}'")]
    MissingOutput(String),

    #[error("Failed to write {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProvisionError {
    /// Wrap an error raised while running a Terraform subcommand
    ///
    /// Steps that cannot change remote state yield `TerraformFailed`; the
    /// rest yield `ApplyFailed`. An already wrapped error is kept as is.
    pub fn during(self, step: TerraformStep) -> Self {
        match self {
            already @ (ProvisionError::ApplyFailed { .. }
            | ProvisionError::TerraformFailed { .. }) => already,
            other if step.touches_remote() => ProvisionError::ApplyFailed {
                step,
                source: Box::new(other),
            },
            other => ProvisionError::TerraformFailed {
                step,
                source: Box::new(other),
            },
        }
    }

    /// Whether remote infrastructure may have been changed before the failure
    pub fn remote_state_uncertain(&self) -> bool {
        matches!(self, ProvisionError::ApplyFailed { .. })
    }
}

impl From<CloudError> for ProvisionError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::ProviderUnreachable(msg) => ProvisionError::ProviderUnreachable(msg),
            CloudError::AuthError(msg) => ProvisionError::AuthError(msg),
            CloudError::InvalidConfig(msg) => ProvisionError::InvalidIntent(msg),
            CloudError::Json(e) => ProvisionError::Json(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_during_wraps_once() {
        let err = ProvisionError::ProcessFailed {
            command: "terraform apply".into(),
            exit_code: 1,
            stderr: "name already exists".into(),
        }
        .during(TerraformStep::Apply)
        .during(TerraformStep::Output);

        match &err {
            ProvisionError::ApplyFailed { step, .. } => assert_eq!(*step, TerraformStep::Apply),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(err.remote_state_uncertain());
        let msg = err.to_string();
        assert!(msg.contains("name already exists"));
        assert!(msg.contains("Remote resources may already exist"));
    }

    #[test]
    fn test_local_steps_leave_remote_untouched() {
        for step in [TerraformStep::Init, TerraformStep::Plan, TerraformStep::Show] {
            let err = ProvisionError::ProcessFailed {
                command: format!("terraform {}", step),
                exit_code: 1,
                stderr: "Error: Invalid provider configuration".into(),
            }
            .during(step);

            assert!(matches!(err, ProvisionError::TerraformFailed { .. }));
            assert!(!err.remote_state_uncertain());
            let msg = err.to_string();
            assert!(msg.contains("Invalid provider configuration"));
            assert!(!msg.contains("Remote resources may already exist"));
        }

        for step in [
            TerraformStep::Apply,
            TerraformStep::Output,
            TerraformStep::Import,
            TerraformStep::Destroy,
        ] {
            let err = ProvisionError::MissingOutput("droplet_ip".into()).during(step);
            assert!(err.remote_state_uncertain(), "{step} should be remote-uncertain");
        }
    }

    #[test]
    fn test_cloud_error_conversion() {
        let err: ProvisionError = CloudError::AuthError("bad token".into()).into();
        assert!(matches!(err, ProvisionError::AuthError(_)));
        assert!(!err.remote_state_uncertain());
    }
}
