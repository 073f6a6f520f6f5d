pub mod deploy;
pub mod destroy;
pub mod regions;
pub mod status;
pub mod version;

use clap::Args;
use std::path::PathBuf;

/// Which deployment a command acts on
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Deployment name; prefixed with the namespace tag when missing
    #[arg(short, long, env = "WARDROBE_NAME")]
    pub name: Option<String>,

    /// DigitalOcean region slug (see `wardrobe regions`)
    #[arg(short, long, env = "WARDROBE_REGION")]
    pub region: Option<String>,

    /// SSH public key installed on the droplet
    #[arg(long = "ssh-key", env = "WARDROBE_SSH_KEY")]
    pub ssh_key: Option<PathBuf>,
}
