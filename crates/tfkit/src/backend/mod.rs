//! Backend abstraction for Terraform operations.
//!
//! The [`Backend`] trait is the five-operation contract this crate drives:
//! init, plan, apply, destroy and output. [`terraform::TerraformBackend`]
//! runs the real binary; [`MockBackend`] answers from memory and records
//! every call for tests.
//!
//! ```
//! use tfkit::backend::{Backend, MockBackend};
//! use tfkit::{Invocation, Operation};
//!
//! let mock = MockBackend::new();
//! mock.set_output_values("master_lb", &["lb.example.com"]);
//!
//! let inv = Invocation::new("/tmp/state/demo");
//! let raw = mock.output(&inv, "master_lb").unwrap();
//! assert!(raw.contains("lb.example.com"));
//! assert_eq!(mock.operations(), vec![Operation::Output]);
//! ```

pub mod terraform;

use crate::error::{Error, Result};
use crate::types::{Invocation, Operation, render_output_list};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for Terraform operations.
///
/// Every method blocks until the underlying process (if any) has exited.
/// Lifecycle operations stream their combined output to `output`.
pub trait Backend: Send + Sync {
    /// Prepare the working directory for the configuration in `provider_dir`.
    fn init(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        output: &mut (dyn Write + Send),
    ) -> Result<()>;

    /// Write a plan file called `plan_name` into the working directory.
    fn plan(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()>;

    /// Apply a previously written plan file without prompting.
    fn apply(
        &self,
        invocation: &Invocation,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()>;

    /// Destroy everything tracked in the working directory without prompting.
    fn destroy(&self, invocation: &Invocation, output: &mut (dyn Write + Send)) -> Result<()>;

    /// Return the raw JSON text terraform prints for output `key`.
    fn output(&self, invocation: &Invocation, key: &str) -> Result<String>;
}

/// A call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Which operation ran
    pub operation: Operation,
    /// Provider dir, plan name or output key, depending on the operation
    pub target: Option<String>,
    /// Working directory of the invocation
    pub working_dir: PathBuf,
    /// Environment layered on top of the process environment
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct MockState {
    outputs: HashMap<String, String>,
    failures: HashMap<Operation, String>,
    calls: Vec<RecordedCall>,
}

/// In-memory backend for tests.
///
/// Clones share state, so a test can hand one clone to a client and keep
/// another to inspect the recorded calls afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a mock with no outputs configured.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the raw text returned for output `key`.
    pub fn set_output(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.state().outputs.insert(key.into(), raw.into());
    }

    /// Set output `key` to a list of strings, in terraform's envelope format.
    pub fn set_output_values<S: AsRef<str>>(&self, key: impl Into<String>, values: &[S]) {
        self.set_output(key, render_output_list(values));
    }

    /// Make `operation` fail with the given exit description.
    pub fn fail(&self, operation: Operation, exit: impl Into<String>) {
        self.state().failures.insert(operation, exit.into());
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// The operations made so far, in order.
    pub fn operations(&self) -> Vec<Operation> {
        self.state().calls.iter().map(|c| c.operation).collect()
    }

    /// Output keys queried so far, in order.
    pub fn queried_keys(&self) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation == Operation::Output)
            .filter_map(|c| c.target.clone())
            .collect()
    }

    fn record(
        &self,
        operation: Operation,
        invocation: &Invocation,
        target: Option<String>,
    ) -> Result<()> {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            operation,
            target,
            working_dir: invocation.working_dir.clone(),
            env: invocation.effective_env(),
        });
        match state.failures.get(&operation) {
            Some(exit) if operation == Operation::Output => Err(Error::OutputQuery {
                key: String::new(),
                message: format!("terraform output exited with {exit}"),
                raw: String::new(),
            }),
            Some(exit) => Err(Error::CommandFailed {
                operation,
                exit: exit.clone(),
                output: format!("mock {operation} failure"),
            }),
            None => Ok(()),
        }
    }

    fn lifecycle(
        &self,
        operation: Operation,
        invocation: &Invocation,
        target: Option<String>,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        self.record(operation, invocation, target)?;
        writeln!(output, "mock terraform {operation} complete")?;
        Ok(())
    }
}

impl Backend for MockBackend {
    fn init(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        let target = provider_dir.display().to_string();
        self.lifecycle(Operation::Init, invocation, Some(target), output)
    }

    fn plan(
        &self,
        invocation: &Invocation,
        _provider_dir: &Path,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        self.lifecycle(
            Operation::Plan,
            invocation,
            Some(plan_name.to_string()),
            output,
        )
    }

    fn apply(
        &self,
        invocation: &Invocation,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        self.lifecycle(
            Operation::Apply,
            invocation,
            Some(plan_name.to_string()),
            output,
        )
    }

    fn destroy(&self, invocation: &Invocation, output: &mut (dyn Write + Send)) -> Result<()> {
        self.lifecycle(Operation::Destroy, invocation, None, output)
    }

    fn output(&self, invocation: &Invocation, key: &str) -> Result<String> {
        self.record(Operation::Output, invocation, Some(key.to_string()))
            .map_err(|e| match e {
                Error::OutputQuery { message, raw, .. } => Error::OutputQuery {
                    key: key.to_string(),
                    message,
                    raw,
                },
                other => other,
            })?;

        self.state()
            .outputs
            .get(key)
            .cloned()
            .ok_or_else(|| Error::OutputQuery {
                key: key.to_string(),
                message: "terraform output exited with exit status: 1".to_string(),
                raw: format!("The output variable requested could not be found: {key}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv() -> Invocation {
        Invocation::new("/state/demo").with_env([("SECRET", "s3cr3t")])
    }

    #[test]
    fn test_mock_records_lifecycle_calls() {
        let mock = MockBackend::new();
        let mut out = Vec::new();

        mock.init(&inv(), Path::new("/providers/aws"), &mut out).unwrap();
        mock.plan(&inv(), Path::new("/providers/aws"), "demo", &mut out)
            .unwrap();
        mock.apply(&inv(), "demo", &mut out).unwrap();

        assert_eq!(
            mock.operations(),
            vec![Operation::Init, Operation::Plan, Operation::Apply]
        );
        let calls = mock.calls();
        assert_eq!(calls[0].target.as_deref(), Some("/providers/aws"));
        assert_eq!(calls[2].target.as_deref(), Some("demo"));
        assert!(calls[0].env.contains(&("SECRET".to_string(), "s3cr3t".to_string())));
        assert!(
            calls[0]
                .env
                .contains(&("TF_IN_AUTOMATION".to_string(), "True".to_string()))
        );
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_mock_configured_failure() {
        let mock = MockBackend::new();
        mock.fail(Operation::Apply, "exit status: 1");

        let err = mock.apply(&inv(), "demo", &mut std::io::sink()).unwrap_err();
        match err {
            Error::CommandFailed {
                operation, exit, ..
            } => {
                assert_eq!(operation, Operation::Apply);
                assert_eq!(exit, "exit status: 1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(mock.operations(), vec![Operation::Apply]);
    }

    #[test]
    fn test_mock_missing_output() {
        let mock = MockBackend::new();
        let err = mock.output(&inv(), "worker_hosts").unwrap_err();
        assert!(matches!(err, Error::OutputQuery { ref key, .. } if key == "worker_hosts"));
        assert_eq!(mock.queried_keys(), vec!["worker_hosts"]);
    }

    #[test]
    fn test_mock_output_failure_names_key() {
        let mock = MockBackend::new();
        mock.set_output_values("etcd_hosts", &["e1"]);
        mock.fail(Operation::Output, "exit status: 1");

        let err = mock.output(&inv(), "etcd_hosts").unwrap_err();
        assert!(matches!(err, Error::OutputQuery { ref key, .. } if key == "etcd_hosts"));
    }

    #[test]
    fn test_mock_clones_share_state() {
        let mock = MockBackend::new();
        let handle = mock.clone();
        mock.destroy(&inv(), &mut std::io::sink()).unwrap();
        assert_eq!(handle.operations(), vec![Operation::Destroy]);
    }
}
