//! Settings file (`<config_dir>/provctl.toml`) and final path resolution.
//!
//! Precedence for every setting: command line flag, environment variable,
//! settings file, built-in default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "provctl.toml";

/// Optional settings read from `provctl.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Providers root
    pub providers_dir: Option<String>,
    /// Cluster state root
    pub state_dir: Option<String>,
    /// Terraform executable
    pub terraform: Option<String>,
    /// Owner recorded in the Terraform variables
    pub cluster_owner: Option<String>,
}

impl Settings {
    /// Load the settings file from the config directory, if it exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_dir()?.join(SETTINGS_FILE))
    }

    /// Load settings from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Combine with command line values into the settings commands use.
    pub fn resolve(&self, flags: Flags) -> Result<Resolved> {
        let providers_dir = match flags.providers_dir {
            Some(dir) => dir,
            None => paths::providers_dir(self.providers_dir.as_deref())?,
        };
        let state_dir = match flags.state_dir {
            Some(dir) => dir,
            None => paths::state_dir(self.state_dir.as_deref())?,
        };
        let terraform = flags
            .terraform
            .or_else(|| self.terraform.as_deref().map(paths::expand));
        let cluster_owner = flags
            .cluster_owner
            .or_else(|| self.cluster_owner.clone())
            .or_else(default_owner)
            .unwrap_or_default();

        Ok(Resolved {
            providers_dir,
            state_dir,
            terraform,
            cluster_owner,
        })
    }
}

fn default_owner() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}

/// Values given on the command line (or through clap-bound env vars).
#[derive(Debug, Default, Clone)]
pub struct Flags {
    pub providers_dir: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub terraform: Option<PathBuf>,
    pub cluster_owner: Option<String>,
}

/// Final settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub providers_dir: PathBuf,
    pub state_dir: PathBuf,
    /// `None` means look up `terraform` on PATH
    pub terraform: Option<PathBuf>,
    pub cluster_owner: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::tests::{env_lock, without_env_var};
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_from(&tmp.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_parse_settings() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(
            &path,
            "providers_dir = \"/opt/providers\"\nterraform = \"/usr/local/bin/terraform\"\ncluster_owner = \"platform\"\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.providers_dir.as_deref(), Some("/opt/providers"));
        assert_eq!(settings.cluster_owner.as_deref(), Some("platform"));
        assert_eq!(settings.state_dir, None);
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(SETTINGS_FILE);
        fs::write(&path, "provider_dir = \"/typo\"\n").unwrap();
        let err = Settings::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse settings file"));
    }

    #[test]
    fn test_flags_beat_settings() {
        let settings = Settings {
            providers_dir: Some("/from/file".to_string()),
            state_dir: Some("/from/file/state".to_string()),
            terraform: Some("/from/file/terraform".to_string()),
            cluster_owner: Some("file-owner".to_string()),
        };
        let resolved = settings
            .resolve(Flags {
                providers_dir: Some(PathBuf::from("/flag/providers")),
                state_dir: Some(PathBuf::from("/flag/state")),
                terraform: Some(PathBuf::from("tofu")),
                cluster_owner: Some("flag-owner".to_string()),
            })
            .unwrap();
        assert_eq!(resolved.providers_dir, PathBuf::from("/flag/providers"));
        assert_eq!(resolved.state_dir, PathBuf::from("/flag/state"));
        assert_eq!(resolved.terraform, Some(PathBuf::from("tofu")));
        assert_eq!(resolved.cluster_owner, "flag-owner");
    }

    #[test]
    fn test_settings_used_without_flags() {
        let _guard = env_lock();
        let settings = Settings {
            providers_dir: Some("/from/file".to_string()),
            state_dir: Some("/from/file/state".to_string()),
            terraform: None,
            cluster_owner: Some("file-owner".to_string()),
        };
        let resolved = without_env_var(paths::ENV_PROVIDERS_DIR, || {
            without_env_var(paths::ENV_STATE_DIR, || settings.resolve(Flags::default()))
        })
        .unwrap();
        assert_eq!(resolved.providers_dir, PathBuf::from("/from/file"));
        assert_eq!(resolved.state_dir, PathBuf::from("/from/file/state"));
        assert_eq!(resolved.terraform, None);
        assert_eq!(resolved.cluster_owner, "file-owner");
    }
}
