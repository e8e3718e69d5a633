//! Error types for Terraform operations.
//!
//! Errors are categorized so callers can tell a Terraform run that failed
//! apart from an output that could not be decoded. Nothing in this crate
//! retries: the category only drives user feedback.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::Operation;

/// Categories of Terraform errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The terraform binary could not be found or started
    NotFound,
    /// Terraform ran and exited with a failure
    CommandFailed,
    /// An output query failed or returned something other than a string list
    Output,
    /// Local IO failure (pipes, working directory)
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Terraform not available",
            Self::CommandFailed => "Terraform command failed",
            Self::Output => "Unreadable Terraform output",
            Self::Io => "Local IO error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Install Terraform or point --terraform at the binary",
            Self::CommandFailed => {
                "Inspect the Terraform output above, fix the cause and re-run the command"
            }
            Self::Output => {
                "Check that the provider templates declare the expected outputs as string lists"
            }
            Self::Io => "Check permissions and free space of the cluster state directory",
        }
    }
}

/// Errors that can occur while driving Terraform.
#[derive(Debug, Error)]
pub enum Error {
    /// Terraform is not installed or not found in PATH
    #[error("terraform not found{}", searched_suffix(.searched))]
    TerraformNotFound {
        /// Explicit path that was checked, if one was given
        searched: Option<PathBuf>,
    },

    /// The terraform process could not be started
    #[error("failed to start terraform {operation}: {source}")]
    Spawn {
        /// Operation that was being started
        operation: Operation,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Terraform exited unsuccessfully
    #[error("terraform {operation} failed ({exit})")]
    CommandFailed {
        /// Operation that failed
        operation: Operation,
        /// Exit status description
        exit: String,
        /// Last lines of combined stdout/stderr
        output: String,
    },

    /// An output value could not be collected or decoded
    #[error("error collecting terraform output {key:?}: {message}{}", raw_suffix(.raw))]
    OutputQuery {
        /// Output key that was queried
        key: String,
        /// What went wrong
        message: String,
        /// Raw text printed by terraform
        raw: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn searched_suffix(searched: &Option<PathBuf>) -> String {
    searched
        .as_ref()
        .map(|p| format!(" at {}", p.display()))
        .unwrap_or_else(|| " in PATH".to_string())
}

fn raw_suffix(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        String::new()
    } else {
        format!("\n{raw}")
    }
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::TerraformNotFound { .. } | Error::Spawn { .. } => ErrorCategory::NotFound,
            Error::CommandFailed { .. } => ErrorCategory::CommandFailed,
            Error::OutputQuery { .. } => ErrorCategory::Output,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// The operation this error belongs to, when there is one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Spawn { operation, .. } | Error::CommandFailed { operation, .. } => {
                Some(*operation)
            }
            Error::OutputQuery { .. } => Some(Operation::Output),
            _ => None,
        }
    }

    /// Captured terraform output attached to this error, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Error::CommandFailed { output, .. } => Some(output),
            Error::OutputQuery { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Result type for Terraform operations.
pub type Result<T> = std::result::Result<T, Error>;
