use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "provctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision cluster infrastructure with Terraform", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v streams Terraform output, -vv adds debug logs)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding one subdirectory per provider
    #[arg(long, global = true, value_name = "DIR")]
    pub providers_dir: Option<PathBuf>,

    /// Directory holding one state directory per cluster
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Terraform executable (name on PATH or full path)
    #[arg(long, global = true, value_name = "PATH")]
    pub terraform: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update the infrastructure described by a plan file
    Provision(ProvisionArgs),

    /// Tear down a cluster's infrastructure
    Destroy(DestroyArgs),

    /// Show what is on disk for one cluster, or list all clusters
    Status(StatusArgs),

    /// List available providers and the variables they need
    Providers,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Provision
// ============================================================================

#[derive(Parser)]
pub struct ProvisionArgs {
    /// Cluster plan (YAML)
    pub plan: PathBuf,

    /// Write the populated plan here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Cluster owner recorded in the Terraform variables
    #[arg(long, env = "PROVCTL_CLUSTER_OWNER")]
    pub owner: Option<String>,
}

// ============================================================================
// Destroy
// ============================================================================

#[derive(Parser)]
pub struct DestroyArgs {
    /// Provider the cluster was provisioned with
    pub provider: String,

    /// Cluster name
    pub cluster: String,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Status
// ============================================================================

#[derive(Parser)]
pub struct StatusArgs {
    /// Cluster name (omit to list all clusters)
    pub cluster: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}
