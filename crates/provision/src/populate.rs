//! Fills a plan's node groups from Terraform outputs after apply.

use crate::error::Result;
use crate::plan::{ClusterPlan, MasterNodeGroup, Role};
use crate::reconcile::OutputReconciler;

/// Return `plan` with every role populated from `outputs`.
///
/// Masters, their load balancer, etcd and workers are always queried.
/// Ingress and storage are queried only when the plan asks for nodes of
/// that role; otherwise they are returned untouched. Groups are replaced,
/// not merged. The first failure is returned and the plan is dropped.
pub fn populate(outputs: &OutputReconciler<'_>, mut plan: ClusterPlan) -> Result<ClusterPlan> {
    let masters = outputs.nodes(Role::Master)?;
    let lb = outputs.load_balancer(Role::Master)?;
    // Both names come from the one load balancer output.
    plan.master = MasterNodeGroup {
        expected_count: masters.expected_count,
        nodes: masters.nodes,
        load_balanced_fqdn: lb.clone(),
        load_balanced_short_name: lb,
    };

    plan.etcd = outputs.nodes(Role::Etcd)?;
    plan.worker = outputs.nodes(Role::Worker)?;

    if plan.ingress.expected_count > 0 {
        plan.ingress = outputs.nodes(Role::Ingress)?;
    }
    if plan.storage.expected_count > 0 {
        plan.storage = outputs.nodes(Role::Storage)?;
    }

    Ok(plan)
}
