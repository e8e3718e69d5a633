use anyhow::{Context as _, Result};
use chrono::Utc;
use colored::Colorize;
use provision::state::{inspect, list_clusters};
use provision::{ClusterStatus, KeyStatus, StateRecord};
use serde::Serialize;
use std::path::Path;

use crate::Context;
use crate::cli::StatusArgs;
use crate::ui;

/// JSON shape of one cluster's status.
#[derive(Serialize)]
struct Report<'a> {
    cluster: &'a str,
    state_dir: &'a Path,
    exists: bool,
    keys: String,
    variables_written: bool,
    plan_artifact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_operation: Option<&'a StateRecord>,
}

impl<'a> From<&'a ClusterStatus> for Report<'a> {
    fn from(status: &'a ClusterStatus) -> Self {
        Self {
            cluster: &status.cluster,
            state_dir: &status.state_dir,
            exists: status.exists,
            keys: describe_keys(status.keys),
            variables_written: status.variables_written,
            plan_artifact: status.plan_artifact,
            last_operation: status.record.as_ref(),
        }
    }
}

pub fn run(ctx: &Context, args: &StatusArgs) -> Result<()> {
    let root = &ctx.settings.state_dir;
    let statuses = match &args.cluster {
        Some(cluster) => vec![inspect(root, cluster)?],
        None => list_clusters(root)?
            .iter()
            .map(|cluster| inspect(root, cluster))
            .collect::<provision::Result<Vec<_>>>()?,
    };

    if args.json {
        let reports: Vec<Report<'_>> = statuses.iter().map(Report::from).collect();
        let json = match &args.cluster {
            Some(_) => serde_json::to_string_pretty(&reports[0]),
            None => serde_json::to_string_pretty(&reports),
        }
        .context("Failed to serialize status")?;
        println!("{json}");
        return Ok(());
    }

    match &args.cluster {
        Some(_) => show_cluster(&statuses[0]),
        None => show_all(root, &statuses),
    }
    Ok(())
}

fn show_cluster(status: &ClusterStatus) {
    ui::header(&format!("Cluster {}", status.cluster));
    ui::kv("State directory", &status.state_dir.display().to_string());
    if !status.exists {
        ui::warn("No state directory; this cluster was never provisioned here");
        return;
    }

    ui::kv("SSH keys", &describe_keys(status.keys));
    ui::kv("Variables", yes_no(status.variables_written));
    ui::kv("Plan file", yes_no(status.plan_artifact));

    match &status.record {
        Some(record) => {
            ui::section("Last operation");
            ui::kv("Operation", &record.operation.to_string());
            ui::kv("Provider", &record.provider);
            ui::kv(
                "When",
                &format!(
                    "{} ({})",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                    ui::format_age(record.timestamp, Utc::now())
                ),
            );
            if let Some(lb) = &record.master_load_balancer {
                ui::kv("Load balancer", lb);
            }
        }
        None => ui::dim("No completed operation recorded"),
    }

    if let KeyStatus::Inconsistent(_) = status.keys {
        ui::warn("Key pair is incomplete; remove the remaining key file to regenerate it");
    }
}

fn show_all(root: &Path, statuses: &[ClusterStatus]) {
    if statuses.is_empty() {
        ui::info(&format!("No clusters in {}", root.display()));
        return;
    }

    ui::header("Clusters");
    let now = Utc::now();
    for status in statuses {
        let summary = match &status.record {
            Some(record) => format!(
                "{} via {}, {}",
                record.operation,
                record.provider,
                ui::format_age(record.timestamp, now)
            ),
            None => "no completed operation".dimmed().to_string(),
        };
        println!("  {} {}", status.cluster.bold(), summary);
    }
}

fn describe_keys(keys: KeyStatus) -> String {
    match keys {
        KeyStatus::Absent => "absent".to_string(),
        KeyStatus::Present => "present".to_string(),
        KeyStatus::Inconsistent(kind) => format!("inconsistent (only {} key)", kind.as_str()),
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision::keypair::KeyKind;
    use provision::{LastOperation, StateRecord};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_describe_keys() {
        assert_eq!(describe_keys(KeyStatus::Absent), "absent");
        assert_eq!(
            describe_keys(KeyStatus::Inconsistent(KeyKind::Private)),
            "inconsistent (only private key)"
        );
    }

    #[test]
    fn test_report_json() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("demo");
        fs::create_dir(&dir).unwrap();
        StateRecord::now("demo", "aws", LastOperation::Provision)
            .with_load_balancer("lb.example.com")
            .save(&dir)
            .unwrap();

        let status = inspect(tmp.path(), "demo").unwrap();
        let json = serde_json::to_value(Report::from(&status)).unwrap();
        assert_eq!(json["cluster"], "demo");
        assert_eq!(json["keys"], "absent");
        assert_eq!(json["last_operation"]["operation"], "provision");
        assert_eq!(
            json["last_operation"]["master_load_balancer"],
            "lb.example.com"
        );
    }

    #[test]
    fn test_report_json_without_record() {
        let tmp = TempDir::new().unwrap();
        let status = inspect(tmp.path(), "ghost").unwrap();
        let json = serde_json::to_value(Report::from(&status)).unwrap();
        assert_eq!(json["exists"], false);
        assert!(json.get("last_operation").is_none());
    }
}
