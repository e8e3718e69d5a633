//! Terraform variable files written into the cluster state directory.
//!
//! `terraform.tfvars` carries the cluster topology under fixed names that
//! provider templates rely on. `provider.auto.tfvars` carries the plan's
//! provider options as-is.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::keypair::KeyPair;
use crate::plan::ClusterPlan;

/// Topology variables file.
pub const CLUSTER_VARS_FILE: &str = "terraform.tfvars";

/// Provider options file.
pub const PROVIDER_VARS_FILE: &str = "provider.auto.tfvars";

/// Variables every provider template receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterVariables {
    /// Version of the tool that provisioned the cluster
    pub kismatic_version: String,
    /// Who owns the cluster
    pub cluster_owner: String,
    /// Private key path
    pub private_ssh_key_path: PathBuf,
    /// Public key path
    pub public_ssh_key_path: PathBuf,
    /// Cluster name
    pub cluster_name: String,
    /// Master count
    pub master_count: usize,
    /// etcd count
    pub etcd_count: usize,
    /// Worker count
    pub worker_count: usize,
    /// Ingress count
    pub ingress_count: usize,
    /// Storage count
    pub storage_count: usize,
}

impl ClusterVariables {
    /// Collect the variables for `plan`.
    pub fn new(plan: &ClusterPlan, keys: &KeyPair, build_version: &str, owner: &str) -> Self {
        Self {
            kismatic_version: build_version.to_string(),
            cluster_owner: owner.to_string(),
            private_ssh_key_path: keys.private_key().to_path_buf(),
            public_ssh_key_path: keys.public_key().to_path_buf(),
            cluster_name: plan.name().to_string(),
            master_count: plan.master.expected_count,
            etcd_count: plan.etcd.expected_count,
            worker_count: plan.worker.expected_count,
            ingress_count: plan.ingress.expected_count,
            storage_count: plan.storage.expected_count,
        }
    }
}

/// Write both variable files into `state_dir`.
pub fn write(
    state_dir: &Path,
    plan: &ClusterPlan,
    keys: &KeyPair,
    build_version: &str,
    owner: &str,
) -> Result<()> {
    let vars = ClusterVariables::new(plan, keys, build_version, owner);
    let cluster = serde_json::to_string_pretty(&vars)
        .map_err(|e| Error::serialization("terraform variables", e))?;
    write_file(&state_dir.join(CLUSTER_VARS_FILE), &cluster)?;

    let options = serde_json::to_string_pretty(&plan.provisioner.options)
        .map_err(|e| Error::serialization("provider options", e))?;
    write_file(&state_dir.join(PROVIDER_VARS_FILE), &options)?;

    log::info!("Wrote Terraform variables to {}", state_dir.display());
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}
