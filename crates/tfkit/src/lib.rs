//! # tfkit
//!
//! Pure Rust library for driving the Terraform CLI.
//!
//! Terraform is treated as an opaque state machine with exactly five
//! operations:
//! - `init <dir>`: prepare a working directory for a configuration
//! - `plan -out=<name> <dir>`: write a named plan file
//! - `apply -input=false <name>`: apply a plan file without prompting
//! - `destroy -force`: tear down everything in the working directory
//! - `output -json <key>`: read one named output value
//!
//! Every command runs in the caller's working directory with the process
//! environment, any extra variables from the [`Invocation`], and
//! `TF_IN_AUTOMATION=True`. Lifecycle commands stream their combined output
//! to a caller-supplied writer. Nothing is retried.
//!
//! ## Example
//!
//! ```no_run
//! use tfkit::{Client, Invocation};
//! use std::path::Path;
//!
//! let client = Client::new(None).expect("terraform not available");
//! let inv = Invocation::new("/var/lib/provctl/clusters/demo")
//!     .with_env([("AWS_ACCESS_KEY_ID", "...")]);
//!
//! let mut out = std::io::stderr();
//! let provider = Path::new("/etc/provctl/providers/aws");
//! client.init(&inv, provider, &mut out).unwrap();
//! let plan = client.plan(&inv, provider, "demo", &mut out).unwrap();
//! client.apply(&inv, &plan, &mut out).unwrap();
//!
//! let ips = client.output_list(&inv, "master_pub_ips").unwrap();
//! println!("masters: {ips:?}");
//! ```
//!
//! ## Testing
//!
//! [`MockBackend`] implements the same contract in memory and records
//! every call, so orchestration code can be tested without terraform.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod stream;
pub mod types;

pub use backend::MockBackend;
pub use error::{Error, ErrorCategory, Result};
pub use types::{AUTOMATION_ENV, Invocation, Operation, PlanArtifact, parse_output_list};

use backend::{Backend, terraform::TerraformBackend};
use std::io::Write;
use std::path::Path;

/// High-level client for Terraform operations.
///
/// The client wraps a backend and adds plan artifact bookkeeping and
/// decoding of output values.
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a new Client running the real terraform binary.
    ///
    /// Returns an error if terraform cannot be found.
    pub fn new(binary: Option<&Path>) -> Result<Self> {
        let backend = TerraformBackend::new(binary)?;
        Ok(Self {
            backend: Box::new(backend),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    // =========================================================================
    // Lifecycle Operations
    // =========================================================================

    /// Run `terraform init` for the configuration in `provider_dir`.
    pub fn init(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        self.backend.init(invocation, provider_dir, output)
    }

    /// Run `terraform plan`, writing a plan file named `plan_name`.
    pub fn plan(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<PlanArtifact> {
        self.backend
            .plan(invocation, provider_dir, plan_name, output)?;
        Ok(PlanArtifact::new(plan_name))
    }

    /// Apply a plan produced by [`plan`](Self::plan).
    pub fn apply(
        &self,
        invocation: &Invocation,
        plan: &PlanArtifact,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        self.backend.apply(invocation, plan.name(), output)
    }

    /// Destroy all infrastructure tracked in the working directory.
    pub fn destroy(&self, invocation: &Invocation, output: &mut (dyn Write + Send)) -> Result<()> {
        self.backend.destroy(invocation, output)
    }

    // =========================================================================
    // Output Queries
    // =========================================================================

    /// Raw text of output `key`.
    pub fn output_raw(&self, invocation: &Invocation, key: &str) -> Result<String> {
        self.backend.output(invocation, key)
    }

    /// Ordered string values of list output `key`.
    pub fn output_list(&self, invocation: &Invocation, key: &str) -> Result<Vec<String>> {
        let raw = self.backend.output(invocation, key)?;
        parse_output_list(key, &raw)
    }
}
