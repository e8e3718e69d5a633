//! Cluster plan: the topology handed to provisioning and returned populated.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{Error, Result};

static NAME: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("name pattern is valid")
});

/// Check a cluster or provider name before it is joined onto a root
/// directory. Rejects separators, `..`, absolute paths and anything else
/// outside `[a-z0-9-]`.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    if NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Node roles. Each role maps to a fixed set of Terraform output keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Control plane nodes, fronted by a load balancer
    Master,
    /// etcd members
    Etcd,
    /// Workload nodes
    Worker,
    /// Ingress nodes (optional)
    Ingress,
    /// Storage nodes (optional)
    Storage,
}

impl Role {
    /// All roles, in population order.
    pub const ALL: [Self; 5] = [
        Self::Master,
        Self::Etcd,
        Self::Worker,
        Self::Ingress,
        Self::Storage,
    ];

    /// Role name as used in output keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Master => "master",
            Self::Etcd => "etcd",
            Self::Worker => "worker",
            Self::Ingress => "ingress",
            Self::Storage => "storage",
        }
    }

    /// Whether a plan may ask for zero nodes of this role.
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Ingress | Self::Storage)
    }

    /// Output key holding the public IPs, e.g. `worker_pub_ips`.
    pub fn public_ips_key(&self) -> String {
        format!("{self}_pub_ips")
    }

    /// Output key holding the internal IPs, e.g. `worker_priv_ips`.
    pub fn internal_ips_key(&self) -> String {
        format!("{self}_priv_ips")
    }

    /// Output key holding the host names, e.g. `worker_hosts`.
    pub fn hosts_key(&self) -> String {
        format!("{self}_hosts")
    }

    /// Output key holding the load balancer endpoint, e.g. `master_lb`.
    pub fn load_balancer_key(&self) -> String {
        format!("{self}_lb")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provisioned machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Host name
    pub host: String,
    /// Public IP
    pub ip: String,
    /// Internal IP, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_ip: Option<String>,
}

/// Nodes of one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    /// How many nodes the role should have
    pub expected_count: usize,
    /// Nodes reported by the provider, in output order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
}

impl NodeGroup {
    /// Group whose expected count is the number of nodes it holds.
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self {
            expected_count: nodes.len(),
            nodes,
        }
    }
}

/// Master nodes plus the load balancer in front of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterNodeGroup {
    /// How many masters the cluster should have
    pub expected_count: usize,
    /// Master nodes, in output order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// Fully qualified load balancer name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub load_balanced_fqdn: String,
    /// Short load balancer name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub load_balanced_short_name: String,
}

/// SSH access to the cluster nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Login user on the nodes
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,
    /// Private key path, set during provisioning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            key: None,
            port: default_ssh_port(),
        }
    }
}

fn default_ssh_port() -> u16 {
    22
}

/// Cluster identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster name; also the state directory and plan file name
    pub name: String,
    /// SSH settings
    #[serde(default)]
    pub ssh: SshConfig,
}

/// Which provider builds the infrastructure, and with what options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider directory name
    pub provider: String,
    /// Provider-specific variables, passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// The cluster topology.
///
/// Provisioning takes the plan by value and returns it with every role's
/// nodes filled in from Terraform outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPlan {
    /// Cluster identity
    pub cluster: Cluster,
    /// Provider selection
    pub provisioner: ProviderConfig,
    /// Master nodes
    pub master: MasterNodeGroup,
    /// etcd nodes
    pub etcd: NodeGroup,
    /// Worker nodes
    pub worker: NodeGroup,
    /// Ingress nodes
    #[serde(default)]
    pub ingress: NodeGroup,
    /// Storage nodes
    #[serde(default)]
    pub storage: NodeGroup,
}

impl ClusterPlan {
    /// Parse a plan from YAML text.
    pub fn from_yaml(text: &str, origin: &Path) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|source| Error::PlanParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse a plan file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::PlanRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }

    /// Render the plan as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::serialization("cluster plan", e))
    }

    /// Cluster name.
    pub fn name(&self) -> &str {
        &self.cluster.name
    }

    /// Provider name.
    pub fn provider(&self) -> &str {
        &self.provisioner.provider
    }

    /// Expected node count for a role.
    pub fn expected_count(&self, role: Role) -> usize {
        match role {
            Role::Master => self.master.expected_count,
            Role::Etcd => self.etcd.expected_count,
            Role::Worker => self.worker.expected_count,
            Role::Ingress => self.ingress.expected_count,
            Role::Storage => self.storage.expected_count,
        }
    }

    /// Nodes currently recorded for a role.
    pub fn nodes(&self, role: Role) -> &[Node] {
        match role {
            Role::Master => &self.master.nodes,
            Role::Etcd => &self.etcd.nodes,
            Role::Worker => &self.worker.nodes,
            Role::Ingress => &self.ingress.nodes,
            Role::Storage => &self.storage.nodes,
        }
    }

    /// Check the plan before anything touches disk.
    pub fn validate(&self) -> Result<()> {
        validate_name("cluster", self.name()).map_err(|e| Error::InvalidPlan(e.to_string()))?;
        if self.provider().trim().is_empty() {
            return Err(Error::InvalidPlan(
                "provisioner.provider must not be empty".to_string(),
            ));
        }
        for role in Role::ALL {
            if !role.is_optional() && self.expected_count(role) == 0 {
                return Err(Error::InvalidPlan(format!(
                    "{role}.expected_count must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}
