//! Secrets sources.
//!
//! A provider descriptor names the environment variables its Terraform
//! configuration needs (cloud credentials, mostly). A [`SecretsGetter`]
//! turns that list into concrete `NAME=value` pairs for one cluster.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error type returned by secrets sources. Passed through unchanged.
pub type SecretsError = Box<dyn std::error::Error + Send + Sync>;

/// One environment variable to set for Terraform.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

impl EnvVar {
    /// Create a variable.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// Values are credentials.
impl fmt::Debug for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVar")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Resolves the environment variables a provider requires.
pub trait SecretsGetter: Send + Sync {
    /// Return values for the variables in `expected`.
    ///
    /// `expected` maps a logical secret name to the environment variable
    /// name Terraform reads it from.
    fn get_as_environment_variables(
        &self,
        cluster: &str,
        expected: &BTreeMap<String, String>,
    ) -> Result<Vec<EnvVar>, SecretsError>;
}

/// Reads required variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSecrets;

/// Some required variables are not set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required environment variables are not set: {}", .0.join(", "))]
pub struct MissingVariables(pub Vec<String>);

impl SecretsGetter for EnvironmentSecrets {
    fn get_as_environment_variables(
        &self,
        cluster: &str,
        expected: &BTreeMap<String, String>,
    ) -> Result<Vec<EnvVar>, SecretsError> {
        let mut vars = Vec::with_capacity(expected.len());
        let mut missing = Vec::new();
        for name in expected.values() {
            match std::env::var(name) {
                Ok(value) if !value.is_empty() => vars.push(EnvVar::new(name, value)),
                _ => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(Box::new(MissingVariables(missing)));
        }
        log::debug!(
            "Resolved {} secret variables for cluster {cluster}",
            vars.len()
        );
        Ok(vars)
    }
}

/// Fixed set of values, keyed by environment variable name.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    values: BTreeMap<String, String>,
}

impl StaticSecrets {
    /// Empty source; every lookup of a required variable fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretsGetter for StaticSecrets {
    fn get_as_environment_variables(
        &self,
        _cluster: &str,
        expected: &BTreeMap<String, String>,
    ) -> Result<Vec<EnvVar>, SecretsError> {
        let mut vars = Vec::with_capacity(expected.len());
        let mut missing = Vec::new();
        for name in expected.values() {
            match self.values.get(name) {
                Some(value) => vars.push(EnvVar::new(name, value)),
                None => missing.push(name.clone()),
            }
        }
        if missing.is_empty() {
            Ok(vars)
        } else {
            Err(Box::new(MissingVariables(missing)))
        }
    }
}
