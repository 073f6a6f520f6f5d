use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "Settings file not found: {0}\n\
        Check the WARDROBE_CONFIG_PATH environment variable"
    )]
    SettingsFileNotFound(PathBuf),

    #[error("Invalid settings in {path}: {message}")]
    InvalidSettings { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
