//! Core types for Terraform invocations.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable marking every run as non-interactive automation.
pub const AUTOMATION_ENV: (&str, &str) = ("TF_IN_AUTOMATION", "True");

/// The five Terraform operations this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `terraform init <dir>`
    Init,
    /// `terraform plan -out=<name> <dir>`
    Plan,
    /// `terraform apply -input=false <name>`
    Apply,
    /// `terraform destroy -force`
    Destroy,
    /// `terraform output -json <key>`
    Output,
}

impl Operation {
    /// Subcommand name as passed to terraform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Destroy => "destroy",
            Self::Output => "output",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and with what environment a terraform command runs.
///
/// The process environment is always inherited; `env` is layered on top,
/// followed by [`AUTOMATION_ENV`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Working directory (the cluster state directory)
    pub working_dir: PathBuf,
    /// Extra `KEY=VALUE` pairs, usually resolved secrets
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// Create an invocation rooted at `working_dir` with no extra environment.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Add environment variables.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The full set of variables layered on top of the process environment.
    pub fn effective_env(&self) -> Vec<(String, String)> {
        let mut env = self.env.clone();
        env.push((AUTOMATION_ENV.0.to_string(), AUTOMATION_ENV.1.to_string()));
        env
    }

    /// Working directory as a path.
    pub fn dir(&self) -> &Path {
        &self.working_dir
    }
}

/// A named plan file produced by `plan` and consumed by `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanArtifact {
    name: String,
}

impl PlanArtifact {
    /// Create a plan artifact reference.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// File name of the plan, relative to the working directory.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shape of `terraform output -json <key>`.
///
/// Older releases wrap the value in an envelope with `sensitive`, `type`
/// and `value` fields; newer ones print the bare value.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OutputPayload {
    Envelope { value: Vec<String> },
    Bare(Vec<String>),
}

/// Decode the raw text of an output query into its ordered string values.
pub fn parse_output_list(key: &str, raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Err(Error::OutputQuery {
            key: key.to_string(),
            message: "terraform printed nothing".to_string(),
            raw: raw.to_string(),
        });
    }

    match serde_json::from_str::<OutputPayload>(raw) {
        Ok(OutputPayload::Envelope { value } | OutputPayload::Bare(value)) => Ok(value),
        Err(e) => Err(Error::OutputQuery {
            key: key.to_string(),
            message: format!("expected a list of strings: {e}"),
            raw: raw.to_string(),
        }),
    }
}

/// Render a list of values the way terraform prints a list output.
pub fn render_output_list<S: AsRef<str>>(values: &[S]) -> String {
    let value: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
    serde_json::json!({
        "sensitive": false,
        "type": "list",
        "value": value,
    })
    .to_string()
}
