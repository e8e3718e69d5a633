//! Error types for provisioning.
//!
//! Every error belongs to one [`ErrorCategory`]. All of them are fatal for
//! the current invocation; nothing in this crate retries or repairs state
//! on its own.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::plan::Role;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown provider, malformed descriptor or invalid plan
    Configuration,
    /// Key pair files exist only partially
    StateConsistency,
    /// The secrets source could not supply a required variable
    SecretResolution,
    /// Terraform failed, or an output query could not be read
    ExternalTool,
    /// Terraform outputs disagree about how many nodes there are
    OutputCardinality,
    /// Local filesystem or serialization failure
    Io,
}

impl ErrorCategory {
    /// Whether an operator has to touch on-disk state before re-running.
    pub fn requires_operator(&self) -> bool {
        matches!(self, Self::StateConsistency)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Configuration => "Configuration error",
            Self::StateConsistency => "Inconsistent cluster state",
            Self::SecretResolution => "Missing secrets",
            Self::ExternalTool => "Terraform error",
            Self::OutputCardinality => "Inconsistent Terraform outputs",
            Self::Io => "Filesystem error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Configuration => "Fix the plan file or provider name and try again",
            Self::StateConsistency => {
                "Recover the missing file if possible, otherwise delete the remaining one"
            }
            Self::SecretResolution => {
                "Export the environment variables the provider requires and try again"
            }
            Self::ExternalTool => "Inspect the Terraform output, fix the cause and re-run",
            Self::OutputCardinality => {
                "The provider templates or a partial apply produced mismatched outputs; \
                 inspect the Terraform state before re-running"
            }
            Self::Io => "Check permissions and free space of the state directory",
        }
    }
}

/// Errors that can occur while provisioning or destroying a cluster.
#[derive(Debug, Error)]
pub enum Error {
    /// No directory for the requested provider
    #[error("provider {provider:?} is not supported (no directory at {})", .dir.display())]
    ProviderNotFound {
        /// Provider name from the plan
        provider: String,
        /// Directory that was expected
        dir: PathBuf,
    },

    /// provider.yaml could not be read
    #[error("could not read provider descriptor {}: {source}", .path.display())]
    DescriptorRead {
        /// Descriptor path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// provider.yaml is not valid
    #[error("could not parse provider descriptor {}: {source}", .path.display())]
    DescriptorParse {
        /// Descriptor path
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// The plan failed validation
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A cluster or provider name cannot be used as a directory name
    #[error(
        "invalid {kind} name {name:?}: must be lowercase alphanumeric characters or '-', \
         starting and ending with an alphanumeric character"
    )]
    InvalidName {
        /// "cluster" or "provider"
        kind: &'static str,
        /// The rejected name
        name: String,
    },

    /// A plan file could not be read
    #[error("could not read plan {}: {source}", .path.display())]
    PlanRead {
        /// Plan path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A plan file could not be parsed
    #[error("could not parse plan {}: {source}", .path.display())]
    PlanParse {
        /// Plan path
        path: PathBuf,
        /// Underlying YAML error
        #[source]
        source: serde_yaml::Error,
    },

    /// Destroy was requested for a cluster without a state directory
    #[error("no state found for cluster {cluster:?} at {}", .dir.display())]
    ClusterNotFound {
        /// Cluster name
        cluster: String,
        /// Expected state directory
        dir: PathBuf,
    },

    /// Exactly one of the two key files exists
    #[error(
        "found an existing {present_kind} key at {}, but did not find the corresponding \
         {missing_kind} key at {}. The corresponding key must be recovered if possible. \
         Otherwise, the existing key must be deleted",
        .present.display(),
        .missing.display()
    )]
    InconsistentKeyState {
        /// "public" or "private"
        present_kind: &'static str,
        /// File that exists
        present: PathBuf,
        /// "public" or "private"
        missing_kind: &'static str,
        /// File that is missing
        missing: PathBuf,
    },

    /// The key generator failed
    #[error("error generating SSH key pair: {0}")]
    KeyGeneration(String),

    /// A value could not be serialized
    #[error("could not serialize {what}: {message}")]
    Serialization {
        /// What was being serialized
        what: &'static str,
        /// Serializer message
        message: String,
    },

    /// A file could not be written
    #[error("error writing {}: {source}", .path.display())]
    Write {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// The cluster state directory could not be created or read
    #[error("error preparing cluster state directory {}: {source}", .path.display())]
    StateDir {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// provctl-state.json exists but cannot be decoded
    #[error("invalid cluster state record {}: {message}", .path.display())]
    StateRecord {
        /// Record path
        path: PathBuf,
        /// Decoder message
        message: String,
    },

    /// The secrets source failed
    #[error("could not get secrets required for cluster {cluster:?}: {source}")]
    SecretResolution {
        /// Cluster name
        cluster: String,
        /// Error returned by the secrets source, unchanged
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Terraform failed
    #[error(transparent)]
    Tool(#[from] tfkit::Error),

    /// A load balancer output did not hold exactly one value
    #[error("expected to get 1 load balancer from {key:?}, but got {actual}")]
    UnexpectedOutputCardinality {
        /// Output key
        key: String,
        /// Number of values returned
        actual: usize,
    },

    /// Node outputs of one role disagree on the node count
    #[error("{role} nodes: expected to get {expected} {field}, but got {actual}")]
    CardinalityMismatch {
        /// Role being reconciled
        role: Role,
        /// Which list disagreed ("host names" or "internal IPs")
        field: &'static str,
        /// Number of public IPs
        expected: usize,
        /// Length of the disagreeing list
        actual: usize,
    },
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ProviderNotFound { .. }
            | Error::DescriptorRead { .. }
            | Error::DescriptorParse { .. }
            | Error::InvalidPlan(_)
            | Error::InvalidName { .. }
            | Error::PlanRead { .. }
            | Error::PlanParse { .. }
            | Error::ClusterNotFound { .. } => ErrorCategory::Configuration,
            Error::InconsistentKeyState { .. } => ErrorCategory::StateConsistency,
            Error::SecretResolution { .. } => ErrorCategory::SecretResolution,
            Error::Tool(_) => ErrorCategory::ExternalTool,
            Error::UnexpectedOutputCardinality { .. } | Error::CardinalityMismatch { .. } => {
                ErrorCategory::OutputCardinality
            }
            Error::KeyGeneration(_)
            | Error::Serialization { .. }
            | Error::Write { .. }
            | Error::StateDir { .. }
            | Error::StateRecord { .. } => ErrorCategory::Io,
        }
    }

    pub(crate) fn serialization(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            what,
            message: err.to_string(),
        }
    }
}

/// Result type for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inconsistent_key_message_names_both_files() {
        let err = Error::InconsistentKeyState {
            present_kind: "public",
            present: PathBuf::from("/s/demo/demo-ssh.pub"),
            missing_kind: "private",
            missing: PathBuf::from("/s/demo/demo-ssh.pem"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("found an existing public key at /s/demo/demo-ssh.pub"));
        assert!(msg.contains("corresponding private key at /s/demo/demo-ssh.pem"));
        assert_eq!(err.category(), ErrorCategory::StateConsistency);
        assert!(err.category().requires_operator());
    }

    #[test]
    fn test_cardinality_message_cites_counts() {
        let err = Error::CardinalityMismatch {
            role: Role::Worker,
            field: "host names",
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "worker nodes: expected to get 2 host names, but got 3"
        );
        assert_eq!(err.category(), ErrorCategory::OutputCardinality);
    }

    #[test]
    fn test_tool_errors_are_transparent() {
        let err: Error = tfkit::Error::CommandFailed {
            operation: tfkit::Operation::Init,
            exit: "exit status: 1".to_string(),
            output: String::new(),
        }
        .into();
        assert_eq!(err.to_string(), "terraform init failed (exit status: 1)");
        assert_eq!(err.category(), ErrorCategory::ExternalTool);
        assert!(!err.category().requires_operator());
    }

    #[test]
    fn test_lb_cardinality_category() {
        let err = Error::UnexpectedOutputCardinality {
            key: "master_lb".to_string(),
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "expected to get 1 load balancer from \"master_lb\", but got 0"
        );
        assert_eq!(err.category(), ErrorCategory::OutputCardinality);
    }
}
