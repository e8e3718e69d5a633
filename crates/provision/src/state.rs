//! Cluster state directories: what is on disk for each cluster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::keypair::{KeyPair, KeyStatus};
use crate::plan::validate_name;
use crate::variables::{CLUSTER_VARS_FILE, PROVIDER_VARS_FILE};

/// Record file written after every successful provision or destroy.
pub const RECORD_FILE: &str = "provctl-state.json";

// ============================================================================
// State Record
// ============================================================================

/// Last operation that completed for a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastOperation {
    /// Infrastructure was created or updated
    Provision,
    /// Infrastructure was torn down
    Destroy,
}

impl fmt::Display for LastOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provision => f.write_str("provision"),
            Self::Destroy => f.write_str("destroy"),
        }
    }
}

/// Informational record of the last completed operation.
///
/// Provisioning never reads this back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Cluster name
    pub cluster: String,
    /// Provider used
    pub provider: String,
    /// What completed
    pub operation: LastOperation,
    /// When it completed
    pub timestamp: DateTime<Utc>,
    /// Master load balancer, after provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_load_balancer: Option<String>,
}

impl StateRecord {
    /// Record stamped with the current time.
    pub fn now(cluster: &str, provider: &str, operation: LastOperation) -> Self {
        Self {
            cluster: cluster.to_string(),
            provider: provider.to_string(),
            operation,
            timestamp: Utc::now(),
            master_load_balancer: None,
        }
    }

    /// Attach the master load balancer.
    pub fn with_load_balancer(mut self, lb: impl Into<String>) -> Self {
        self.master_load_balancer = Some(lb.into());
        self
    }

    /// Write the record into `state_dir`.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let path = state_dir.join(RECORD_FILE);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::serialization("cluster state record", e))?;
        fs::write(&path, content).map_err(|source| Error::Write {
            path: path.clone(),
            source,
        })?;
        log::debug!("Saved state record to {}", path.display());
        Ok(())
    }

    /// Read the record from `state_dir`, if there is one.
    pub fn load(state_dir: &Path) -> Result<Option<Self>> {
        let path = state_dir.join(RECORD_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(Error::StateDir { path, source }),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::StateRecord {
                path,
                message: e.to_string(),
            })
    }
}

// ============================================================================
// Inspection
// ============================================================================

/// Snapshot of a cluster's state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatus {
    /// Cluster name
    pub cluster: String,
    /// State directory path
    pub state_dir: PathBuf,
    /// Whether the state directory exists
    pub exists: bool,
    /// Key pair files
    pub keys: KeyStatus,
    /// Whether both variable files are present
    pub variables_written: bool,
    /// Whether the plan file named after the cluster is present
    pub plan_artifact: bool,
    /// Last recorded operation
    pub record: Option<StateRecord>,
}

/// Look at what is on disk for `cluster` without changing anything.
pub fn inspect(state_root: &Path, cluster: &str) -> Result<ClusterStatus> {
    validate_name("cluster", cluster)?;
    let state_dir = state_root.join(cluster);
    let exists = state_dir.is_dir();
    let keys = KeyPair::for_cluster(&state_dir, cluster).status();
    let variables_written =
        state_dir.join(CLUSTER_VARS_FILE).is_file() && state_dir.join(PROVIDER_VARS_FILE).is_file();
    let plan_artifact = state_dir.join(cluster).is_file();
    let record = if exists {
        StateRecord::load(&state_dir)?
    } else {
        None
    };

    Ok(ClusterStatus {
        cluster: cluster.to_string(),
        state_dir,
        exists,
        keys,
        variables_written,
        plan_artifact,
        record,
    })
}

/// Names of all cluster state directories under `state_root`, sorted.
pub fn list_clusters(state_root: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(state_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(Error::StateDir {
                path: state_root.to_path_buf(),
                source,
            });
        }
    };

    let mut clusters: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .filter(|name| validate_name("cluster", name).is_ok())
        .collect();
    clusters.sort();
    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_round_trip() {
        let tmp = TempDir::new().unwrap();
        let record =
            StateRecord::now("demo", "aws", LastOperation::Provision).with_load_balancer("lb");
        record.save(tmp.path()).unwrap();

        let loaded = StateRecord::load(tmp.path()).unwrap().unwrap();
        assert_eq!(loaded, record);
        let text = fs::read_to_string(tmp.path().join(RECORD_FILE)).unwrap();
        assert!(text.contains("\"operation\": \"provision\""));
    }

    #[test]
    fn test_missing_record() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(StateRecord::load(tmp.path()).unwrap(), None);
    }

    #[test]
    fn test_corrupt_record() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(RECORD_FILE), "{ nope").unwrap();
        let err = StateRecord::load(tmp.path()).unwrap_err();
        assert!(matches!(err, Error::StateRecord { .. }));
    }

    #[test]
    fn test_inspect_unknown_cluster() {
        let tmp = TempDir::new().unwrap();
        let status = inspect(tmp.path(), "demo").unwrap();
        assert!(!status.exists);
        assert_eq!(status.keys, KeyStatus::Absent);
        assert!(!status.variables_written);
        assert!(!status.plan_artifact);
        assert_eq!(status.record, None);
    }

    #[test]
    fn test_inspect_populated_cluster() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("demo");
        fs::create_dir(&dir).unwrap();
        for file in [
            "demo-ssh.pub",
            "demo-ssh.pem",
            CLUSTER_VARS_FILE,
            PROVIDER_VARS_FILE,
            "demo",
        ] {
            fs::write(dir.join(file), "x").unwrap();
        }
        StateRecord::now("demo", "aws", LastOperation::Destroy)
            .save(&dir)
            .unwrap();

        let status = inspect(tmp.path(), "demo").unwrap();
        assert!(status.exists);
        assert_eq!(status.keys, KeyStatus::Present);
        assert!(status.variables_written);
        assert!(status.plan_artifact);
        assert_eq!(
            status.record.map(|r| r.operation),
            Some(LastOperation::Destroy)
        );
    }

    #[test]
    fn test_inspect_rejects_parent_dir() {
        let tmp = TempDir::new().unwrap();
        let err = inspect(tmp.path(), "..").unwrap_err();
        assert!(matches!(err, Error::InvalidName { kind: "cluster", .. }));
    }

    #[test]
    fn test_list_clusters() {
        let tmp = TempDir::new().unwrap();
        for name in ["zeta", "alpha", ".cache", "Not_A_Cluster"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        fs::write(tmp.path().join("stray.txt"), "x").unwrap();

        assert_eq!(list_clusters(tmp.path()).unwrap(), vec!["alpha", "zeta"]);
        assert!(list_clusters(&tmp.path().join("none")).unwrap().is_empty());
    }
}
