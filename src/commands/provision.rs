use anyhow::{Context as _, Result};
use provision::{ClusterPlan, Role};
use std::fs;

use super::{finish_spinner, provisioner, tool_spinner};
use crate::Context;
use crate::cli::ProvisionArgs;
use crate::progress::ToolOutput;
use crate::ui;

pub fn run(ctx: &Context, args: &ProvisionArgs) -> Result<()> {
    let plan = ClusterPlan::load(&args.plan)?;
    let cluster = plan.name().to_string();
    log::debug!(
        "Loaded plan for cluster {cluster} from {}",
        args.plan.display()
    );

    let provisioner = provisioner(ctx)?;
    let pb = tool_spinner(ctx, &format!("Provisioning {cluster}"));
    let result = {
        let mut output = ToolOutput::new(pb.clone(), ctx.verbose > 0);
        provisioner.provision(plan, &mut output)
    };
    finish_spinner(
        ctx,
        &pb,
        &result,
        &format!("Provisioned {cluster}"),
        &format!("Provisioning {cluster} failed"),
    );
    let populated = result?;

    let yaml = populated.to_yaml()?;
    match &args.out {
        Some(path) => {
            fs::write(path, &yaml)
                .with_context(|| format!("Failed to write plan: {}", path.display()))?;
            if !ctx.quiet {
                print_summary(&populated);
                ui::success(&format!("Populated plan written to {}", path.display()));
            }
        }
        None => print!("{yaml}"),
    }
    Ok(())
}

fn print_summary(plan: &ClusterPlan) {
    ui::header(&format!("Cluster {}", plan.name()));
    ui::kv("Provider", plan.provider());
    ui::kv("Load balancer", &plan.master.load_balanced_fqdn);
    if let Some(key) = &plan.cluster.ssh.key {
        ui::kv("SSH key", &key.display().to_string());
    }

    ui::section("Nodes");
    for role in Role::ALL {
        let nodes = plan.nodes(role);
        if nodes.is_empty() {
            continue;
        }
        ui::kv(role.as_str(), &nodes.len().to_string());
        for node in nodes {
            match &node.internal_ip {
                Some(internal) => ui::dim(&format!("{} {} ({internal})", node.host, node.ip)),
                None => ui::dim(&format!("{} {}", node.host, node.ip)),
            }
        }
    }
}
