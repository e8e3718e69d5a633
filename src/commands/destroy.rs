use anyhow::{Context as _, Result};

use super::{finish_spinner, provisioner, tool_spinner};
use crate::Context;
use crate::cli::DestroyArgs;
use crate::progress::ToolOutput;
use crate::ui;

pub fn run(ctx: &Context, args: &DestroyArgs) -> Result<()> {
    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!(
                "Destroy all infrastructure of cluster '{}' ({})?",
                args.cluster, args.provider
            ))
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;

        if !confirmed {
            ui::info("Aborted");
            return Ok(());
        }
    }

    let provisioner = provisioner(ctx)?;
    let pb = tool_spinner(ctx, &format!("Destroying {}", args.cluster));
    let result = {
        let mut output = ToolOutput::new(pb.clone(), ctx.verbose > 0);
        provisioner.destroy(&args.provider, &args.cluster, &mut output)
    };
    finish_spinner(
        ctx,
        &pb,
        &result,
        &format!("Destroyed {}", args.cluster),
        &format!("Destroying {} failed", args.cluster),
    );
    result?;

    if !ctx.quiet {
        ui::dim(&format!(
            "State kept in {}",
            provisioner.cluster_dir(&args.cluster).display()
        ));
    }
    Ok(())
}
