use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use wardrobe_cloud::Plan;
use wardrobe_core::{ProvisionObserver, Stage};

pub struct Spinner {
    progress_bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: impl Into<String>) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message.into());
        pb.enable_steady_tick(Duration::from_millis(120));

        Self { progress_bar: pb }
    }

    /// Print above the spinner without tearing it
    pub fn println(&self, line: impl AsRef<str>) {
        if self.progress_bar.is_hidden() {
            println!("{}", line.as_ref());
        } else {
            self.progress_bar.println(line);
        }
    }

    pub fn finish_success(&self, message: &str) {
        self.progress_bar
            .finish_with_message(format!("{} {}", "✓".green(), message));
    }

    pub fn clear(&self) {
        self.progress_bar.finish_and_clear();
    }
}

/// Drives spinners from orchestrator stage transitions
#[derive(Default)]
pub struct CliObserver {
    current: Mutex<Option<Spinner>>,
}

impl CliObserver {
    /// Finish the running spinner (if any) and optionally start another
    fn swap(&self, finished: Option<&str>, next: Option<String>) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        if let Some(spinner) = current.take() {
            match finished {
                Some(message) => spinner.finish_success(message),
                None => spinner.clear(),
            }
        }
        *current = next.map(Spinner::new);
    }

    pub fn stop(&self) {
        self.swap(None, None);
    }
}

impl ProvisionObserver for CliObserver {
    fn stage_entered(&self, stage: Stage) {
        match stage {
            Stage::Precheck => {
                self.swap(None, Some("Checking for existing resources...".to_string()))
            }
            Stage::Context => self.swap(
                Some("Inventory checked"),
                Some("Detecting your public IP...".to_string()),
            ),
            Stage::Generate => self.swap(Some("Public IP detected"), None),
            Stage::Apply => self.swap(
                None,
                Some("Running terraform init, plan and apply (this takes a few minutes)...".to_string()),
            ),
            Stage::Destroy => self.swap(
                None,
                Some("Running terraform init, import and destroy...".to_string()),
            ),
            Stage::Verify => self.swap(Some("Terraform apply complete"), None),
            Stage::Report => self.swap(Some("Done"), None),
            _ => self.stop(),
        }
    }

    fn plan_ready(&self, plan: &Plan) {
        let mut lines = vec![format!("  Plan: {}", plan.summary())];
        lines.extend(plan_rule_lines(plan));
        let current = self.current.lock().ok();
        for line in lines {
            match current.as_ref().and_then(|guard| guard.as_ref()) {
                Some(spinner) => spinner.println(line),
                None => println!("{}", line),
            }
        }
    }

    fn health_wait(&self, url: &str, timeout: Duration) {
        self.swap(
            None,
            Some(format!(
                "Waiting for the admin UI at {} (up to {}s)...",
                url,
                timeout.as_secs()
            )),
        );
    }
}

/// One line per inbound rule of the planned firewall
fn plan_rule_lines(plan: &Plan) -> Vec<String> {
    plan.inbound_rules()
        .into_iter()
        .map(|(protocol, port, sources)| {
            format!("    allow {} {} from {}", protocol, port, sources.join(", "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_rule_lines() {
        let plan = Plan::from_terraform_json(
            r#"{"resource_changes":[{"address":"digitalocean_firewall.vpn_firewall","type":"digitalocean_firewall","name":"vpn_firewall","change":{"actions":["create"],"after":{"inbound_rule":[{"protocol":"udp","port_range":"51820","source_addresses":["0.0.0.0/0","::/0"]},{"protocol":"tcp","port_range":"51821","source_addresses":["198.51.100.20/32"]}]}}}]}"#,
        )
        .unwrap();
        assert_eq!(
            plan_rule_lines(&plan),
            vec![
                "    allow UDP 51820 from 0.0.0.0/0, ::/0",
                "    allow TCP 51821 from 198.51.100.20/32",
            ]
        );
    }

    #[test]
    fn test_plan_without_firewall_lists_no_rules() {
        let plan = Plan::from_terraform_json(r#"{"resource_changes":[]}"#).unwrap();
        assert!(plan_rule_lines(&plan).is_empty());
    }
}
