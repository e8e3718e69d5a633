//! Provider descriptors (`<providers>/<name>/provider.yaml`).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::plan::validate_name;

/// File name of the descriptor inside a provider directory.
pub const DESCRIPTOR_FILE: &str = "provider.yaml";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    #[serde(default)]
    description: String,
    #[serde(default)]
    environment_variables: BTreeMap<String, String>,
}

/// What a provider needs in order to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    name: String,
    dir: PathBuf,
    description: String,
    environment_variables: BTreeMap<String, String>,
}

impl ProviderDescriptor {
    /// Load the descriptor of `provider` from `providers_root`.
    pub fn load(providers_root: &Path, provider: &str) -> Result<Self> {
        validate_name("provider", provider)?;
        let dir = providers_root.join(provider);
        if !dir.is_dir() {
            return Err(Error::ProviderNotFound {
                provider: provider.to_string(),
                dir,
            });
        }

        let path = dir.join(DESCRIPTOR_FILE);
        let text = fs::read_to_string(&path).map_err(|source| Error::DescriptorRead {
            path: path.clone(),
            source,
        })?;
        let raw: RawDescriptor =
            serde_yaml::from_str(&text).map_err(|source| Error::DescriptorParse {
                path: path.clone(),
                source,
            })?;

        log::debug!(
            "Loaded provider {} ({} required variables)",
            provider,
            raw.environment_variables.len()
        );

        Ok(Self {
            name: provider.to_string(),
            dir,
            description: raw.description,
            environment_variables: raw.environment_variables,
        })
    }

    /// Provider name (its directory name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding the provider's Terraform configuration.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Logical secret name to environment variable name.
    pub fn environment_variables(&self) -> &BTreeMap<String, String> {
        &self.environment_variables
    }
}

/// Every provider under `providers_root` with a loadable descriptor, by name.
///
/// Directories without a descriptor are skipped; a descriptor that exists
/// but fails to load is an error.
pub fn list_providers(providers_root: &Path) -> Result<Vec<ProviderDescriptor>> {
    let entries = match fs::read_dir(providers_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(Error::DescriptorRead {
                path: providers_root.to_path_buf(),
                source,
            });
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().join(DESCRIPTOR_FILE).is_file())
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .filter(|name| validate_name("provider", name).is_ok())
        .collect();
    names.sort();

    names
        .iter()
        .map(|name| ProviderDescriptor::load(providers_root, name))
        .collect()
}
