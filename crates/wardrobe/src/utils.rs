use crate::commands::TargetArgs;
use std::path::{Path, PathBuf};
use wardrobe_config::Settings;
use wardrobe_core::IntentParams;

/// Public keys tried when neither `--ssh-key` nor the settings name one
const DEFAULT_KEY_FILES: [&str; 3] = ["id_ed25519.pub", "id_ecdsa.pub", "id_rsa.pub"];

/// Expand a leading `~/`
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// First existing key under `~/.ssh`
pub fn default_ssh_key() -> Option<PathBuf> {
    let ssh_dir = dirs::home_dir()?.join(".ssh");
    DEFAULT_KEY_FILES
        .iter()
        .map(|name| ssh_dir.join(name))
        .find(|path| path.is_file())
}

/// Private key path for `--generate-key`
///
/// `--ssh-key` names the public key, so a `.pub` suffix is dropped;
/// without it the key goes to `~/.ssh/id_ed25519`.
pub fn new_key_path(ssh_key: Option<&Path>) -> Option<PathBuf> {
    match ssh_key {
        Some(path) => {
            let path = expand_home(path);
            if path.extension().is_some_and(|ext| ext == "pub") {
                Some(path.with_extension(""))
            } else {
                Some(path)
            }
        }
        None => Some(dirs::home_dir()?.join(".ssh").join("id_ed25519")),
    }
}

/// Merge settings with command-line overrides
pub fn intent_params(
    settings: &Settings,
    target: &TargetArgs,
    size: Option<&str>,
    image: Option<&str>,
) -> IntentParams {
    let mut params = IntentParams::from_settings(settings);
    params.name = target.name.clone();
    if let Some(region) = &target.region {
        params.region = region.clone();
    }
    if let Some(size) = size {
        params.size = size.to_string();
    }
    if let Some(image) = image {
        params.image = image.to_string();
    }
    params.ssh_public_key_path = target
        .ssh_key
        .as_deref()
        .or(settings.ssh_key_path.as_deref())
        .map(expand_home)
        .or_else(default_ssh_key);
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            expand_home(Path::new("~/.ssh/id_ed25519.pub")),
            home.join(".ssh/id_ed25519.pub")
        );
        assert_eq!(
            expand_home(Path::new("/etc/keys/a.pub")),
            PathBuf::from("/etc/keys/a.pub")
        );
    }

    #[test]
    fn test_new_key_path() {
        assert_eq!(
            new_key_path(Some(Path::new("/keys/vpn.pub"))),
            Some(PathBuf::from("/keys/vpn"))
        );
        assert_eq!(
            new_key_path(Some(Path::new("/keys/vpn"))),
            Some(PathBuf::from("/keys/vpn"))
        );
        assert_eq!(
            new_key_path(None),
            Some(dirs::home_dir().unwrap().join(".ssh/id_ed25519"))
        );
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            ssh_key_path: Some(PathBuf::from("/from/settings.pub")),
            ..Settings::default()
        };
        let target = TargetArgs {
            name: Some("office".to_string()),
            region: Some("ams3".to_string()),
            ssh_key: Some(PathBuf::from("/from/flag.pub")),
        };

        let params = intent_params(&settings, &target, Some("s-2vcpu-2gb"), None);
        assert_eq!(params.name.as_deref(), Some("office"));
        assert_eq!(params.region, "ams3");
        assert_eq!(params.size, "s-2vcpu-2gb");
        assert_eq!(params.image, settings.image);
        assert_eq!(
            params.ssh_public_key_path,
            Some(PathBuf::from("/from/flag.pub"))
        );
    }

    #[test]
    fn test_settings_key_used_without_flag() {
        let settings = Settings {
            ssh_key_path: Some(PathBuf::from("/from/settings.pub")),
            ..Settings::default()
        };
        let params = intent_params(&settings, &TargetArgs::default(), None, None);
        assert_eq!(params.region, "lon1");
        assert_eq!(
            params.ssh_public_key_path,
            Some(PathBuf::from("/from/settings.pub"))
        );
    }
}
