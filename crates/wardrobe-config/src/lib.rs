pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{
    FirewallSettings, HealthSettings, KeygenSettings, NetworkSettings, ProviderSettings, Settings,
    TerraformSettings,
};

use std::path::{Path, PathBuf};

/// Environment variable pointing directly at a settings file
pub const CONFIG_PATH_ENV: &str = "WARDROBE_CONFIG_PATH";

const CANDIDATES: [&str; 2] = ["wardrobe.local.yaml", "wardrobe.yaml"];

/// Locate the settings file
///
/// Search order:
/// 1. `WARDROBE_CONFIG_PATH` (must exist when set)
/// 2. current directory: `wardrobe.local.yaml`, `wardrobe.yaml`
/// 3. `~/.config/wardrobe/wardrobe.yaml`
///
/// Returns `Ok(None)` when no file exists; the built-in defaults apply then.
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::SettingsFileNotFound(path));
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("wardrobe").join("wardrobe.yaml");
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// Load settings from the discovered file, or defaults when there is none
pub fn load_settings() -> Result<Settings> {
    match find_settings_file()? {
        Some(path) => {
            tracing::debug!("Loading settings from {}", path.display());
            Settings::from_file(&path)
        }
        None => {
            tracing::debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
    }
}

/// Load settings from an explicit path
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(ConfigError::SettingsFileNotFound(path.to_path_buf()));
    }
    Settings::from_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    #[serial]
    fn test_find_settings_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("wardrobe.yaml"), "region: ams3\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_settings_file);

        std::env::set_current_dir(original_dir).unwrap();

        let path = result.unwrap().unwrap();
        assert!(path.ends_with("wardrobe.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_settings_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("wardrobe.yaml"), "region: ams3\n").unwrap();
        fs::write(temp_dir.path().join("wardrobe.local.yaml"), "region: fra1\n").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_settings_file);

        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().unwrap().ends_with("wardrobe.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_settings_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "size: s-1vcpu-2gb\n").unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_settings_file);
        assert_eq!(result.unwrap(), Some(config_path));
    }

    #[test]
    #[serial]
    fn test_env_var_pointing_nowhere_is_an_error() {
        let result = temp_env::with_var(
            CONFIG_PATH_ENV,
            Some("/nonexistent/wardrobe.yaml"),
            find_settings_file,
        );
        assert!(matches!(result, Err(ConfigError::SettingsFileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_load_settings_from_env_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "region: sgp1\nhealth:\n  timeout_secs: 30\n").unwrap();

        let settings =
            temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), load_settings).unwrap();
        assert_eq!(settings.region, "sgp1");
        assert_eq!(settings.health.timeout_secs, 30);
        assert_eq!(settings.health.interval_secs, 3);
    }
}
