use crate::report;
use async_trait::async_trait;
use colored::Colorize;
use std::io::Write;
use tokio::sync::oneshot;
use wardrobe_core::{ConfirmationGate, ConfirmationSummary, Operation};

/// Interactive `[y/N]` prompt on stdin
///
/// Anything other than `y`/`yes`, including EOF, declines.
pub struct StdinGate;

#[async_trait]
impl ConfirmationGate for StdinGate {
    async fn confirm(&self, summary: &ConfirmationSummary) -> bool {
        report::print_confirmation(summary);

        print!("{} [y/N]: ", question(summary.operation).bold());
        if std::io::stdout().flush().is_err() {
            return false;
        }

        match read_line().await {
            Ok(Ok(input)) => is_affirmative(&input),
            Ok(Err(e)) => {
                tracing::warn!("Failed to read confirmation: {}", e);
                false
            }
            Err(_) => false,
        }
    }
}

/// Read one line of stdin on a detached thread, outside the runtime's
/// blocking pool
fn read_line() -> oneshot::Receiver<std::io::Result<String>> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut input = String::new();
        let result = std::io::stdin().read_line(&mut input).map(|_| input);
        let _ = tx.send(result);
    });
    rx
}

/// Approval given up front with `--yes`
pub struct AssumeYes;

#[async_trait]
impl ConfirmationGate for AssumeYes {
    async fn confirm(&self, summary: &ConfirmationSummary) -> bool {
        report::print_confirmation(summary);
        println!("{}", "--yes given, continuing without prompt".dimmed());
        true
    }
}

pub fn gate(assume_yes: bool) -> Box<dyn ConfirmationGate> {
    if assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinGate)
    }
}

fn question(operation: Operation) -> &'static str {
    match operation {
        Operation::Deploy => "Create these resources? Your DigitalOcean account will be billed.",
        Operation::Destroy => "Destroy these resources? This cannot be undone.",
    }
}

pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_explicit_yes_confirms() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("  YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("\n"));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
        assert!(!is_affirmative("sure"));
    }
}
