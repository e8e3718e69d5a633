use anyhow::Result;
use colored::Colorize;
use provision::list_providers;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let root = &ctx.settings.providers_dir;
    let providers = list_providers(root)?;

    if providers.is_empty() {
        ui::warn(&format!("No providers found in {}", root.display()));
        return Ok(());
    }

    ui::header("Providers");
    for provider in &providers {
        ui::section(provider.name());
        if !provider.description().is_empty() {
            ui::dim(provider.description());
        }
        for (name, variable) in provider.environment_variables() {
            let state = if is_set(variable) {
                "set".green()
            } else {
                "not set".yellow()
            };
            ui::kv(name, &format!("{variable} ({state})"));
        }
    }
    Ok(())
}

fn is_set(variable: &str) -> bool {
    std::env::var_os(variable).is_some_and(|v| !v.is_empty())
}
