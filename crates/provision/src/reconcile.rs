//! Turns Terraform outputs back into typed node groups.
//!
//! Outputs are plain string lists correlated by position: the n-th public
//! IP, internal IP and host name describe the same machine. Counts are
//! checked before anything is paired.

use tfkit::{Client, Invocation};

use crate::error::{Error, Result};
use crate::plan::{Node, NodeGroup, Role};

/// Queries role outputs from one cluster's Terraform state.
pub struct OutputReconciler<'a> {
    client: &'a Client,
    invocation: &'a Invocation,
}

impl<'a> OutputReconciler<'a> {
    /// Reconciler querying through `client` with `invocation`.
    pub fn new(client: &'a Client, invocation: &'a Invocation) -> Self {
        Self { client, invocation }
    }

    /// The single load balancer endpoint of `role` (`<role>_lb`).
    pub fn load_balancer(&self, role: Role) -> Result<String> {
        let key = role.load_balancer_key();
        let mut values = self.client.output_list(self.invocation, &key)?;
        if values.len() != 1 {
            return Err(Error::UnexpectedOutputCardinality {
                key,
                actual: values.len(),
            });
        }
        Ok(values.remove(0))
    }

    /// Nodes of `role`, from `<role>_pub_ips`, `<role>_priv_ips` and `<role>_hosts`.
    ///
    /// The group's expected count is the number of nodes returned.
    pub fn nodes(&self, role: Role) -> Result<NodeGroup> {
        let ips = self.client.output_list(self.invocation, &role.public_ips_key())?;
        let internal_ips = self
            .client
            .output_list(self.invocation, &role.internal_ips_key())?;
        let hosts = self.client.output_list(self.invocation, &role.hosts_key())?;

        let nodes = assemble(role, ips, internal_ips, hosts)?;
        log::debug!("Reconciled {} {role} nodes", nodes.len());
        Ok(NodeGroup::from_nodes(nodes))
    }
}

/// Pair the three lists positionally after checking their lengths.
///
/// An empty internal IP list means the provider does not report internal
/// addresses; the nodes are built without one.
pub fn assemble(
    role: Role,
    ips: Vec<String>,
    internal_ips: Vec<String>,
    hosts: Vec<String>,
) -> Result<Vec<Node>> {
    if hosts.len() != ips.len() {
        return Err(Error::CardinalityMismatch {
            role,
            field: "host names",
            expected: ips.len(),
            actual: hosts.len(),
        });
    }
    if !internal_ips.is_empty() && internal_ips.len() != ips.len() {
        return Err(Error::CardinalityMismatch {
            role,
            field: "internal IPs",
            expected: ips.len(),
            actual: internal_ips.len(),
        });
    }

    let mut internal = internal_ips.into_iter();
    Ok(ips
        .into_iter()
        .zip(hosts)
        .map(|(ip, host)| Node {
            host,
            ip,
            internal_ip: internal.next(),
        })
        .collect())
}
