//! Centralized path resolution for provctl
//!
//! # Environment Variables
//!
//! - `PROVCTL_CONFIG_DIR` - Override config directory
//! - `PROVCTL_STATE_DIR` - Override the cluster state root
//! - `PROVCTL_PROVIDERS_DIR` - Override the providers root
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `PROVCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/provctl` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\provctl`
//!    - macOS/Linux: `~/.config/provctl`
//!
//! For state_dir():
//! 1. `PROVCTL_STATE_DIR` environment variable
//! 2. `state_dir` from `provctl.toml`
//! 3. `XDG_STATE_HOME/provctl/clusters` (if set)
//! 4. Platform default:
//!    - Windows: `%LOCALAPPDATA%\provctl\clusters`
//!    - macOS/Linux: `~/.local/state/provctl/clusters`
//!
//! For providers_dir():
//! 1. `PROVCTL_PROVIDERS_DIR` environment variable
//! 2. `providers_dir` from `provctl.toml`
//! 3. `<config_dir>/providers`
//!
//! Command line flags take precedence over all of these; they are applied
//! by the caller.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "PROVCTL_CONFIG_DIR";

/// Environment variable for cluster state root override
pub const ENV_STATE_DIR: &str = "PROVCTL_STATE_DIR";

/// Environment variable for providers root override
pub const ENV_PROVIDERS_DIR: &str = "PROVCTL_PROVIDERS_DIR";

/// Get the provctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("provctl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("provctl");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("provctl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the root directory holding one state directory per cluster
///
/// `configured` is the value from the settings file, if any.
pub fn state_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Some(dir) = configured {
        let path = expand(dir);
        log::debug!("Using state dir from settings: {}", path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("provctl").join("clusters");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join("provctl").join("clusters");
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home
        .join(".local")
        .join("state")
        .join("provctl")
        .join("clusters");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Get the root directory holding one directory per provider
///
/// `configured` is the value from the settings file, if any.
pub fn providers_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_PROVIDERS_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using providers dir from {}: {}",
            ENV_PROVIDERS_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Some(dir) = configured {
        let path = expand(dir);
        log::debug!("Using providers dir from settings: {}", path.display());
        return Ok(path);
    }

    Ok(config_dir()?.join("providers"))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
