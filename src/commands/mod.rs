pub mod destroy;
pub mod providers;
pub mod provision;
pub mod status;

use anyhow::{Context as _, Result};
use indicatif::ProgressBar;
use ::provision::Provisioner;

use crate::Context;
use crate::progress;

/// Build a provisioner from the resolved settings.
fn provisioner(ctx: &Context) -> Result<Provisioner> {
    let client = tfkit::Client::new(ctx.settings.terraform.as_deref())
        .context("Terraform is not available")?;
    Ok(Provisioner::new(
        client,
        &ctx.settings.providers_dir,
        &ctx.settings.state_dir,
    )
    .with_cluster_owner(&ctx.settings.cluster_owner))
}

/// Spinner for a long Terraform run, hidden in quiet mode.
fn tool_spinner(ctx: &Context, msg: &str) -> ProgressBar {
    if ctx.quiet {
        ProgressBar::hidden()
    } else {
        progress::spinner(msg)
    }
}

/// Close a spinner started with [`tool_spinner`].
fn finish_spinner<T, E>(
    ctx: &Context,
    pb: &ProgressBar,
    result: &std::result::Result<T, E>,
    done: &str,
    failed: &str,
) {
    if ctx.quiet {
        pb.finish_and_clear();
    } else if result.is_ok() {
        progress::finish_success(pb, done);
    } else {
        progress::finish_error(pb, failed);
    }
}
