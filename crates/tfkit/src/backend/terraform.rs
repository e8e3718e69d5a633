//! Real Terraform CLI backend using `terraform` commands.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::stream;
use crate::types::{Invocation, Operation};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

/// Backend that executes real `terraform` commands.
pub struct TerraformBackend {
    /// Path to the terraform executable
    binary: PathBuf,
}

impl TerraformBackend {
    /// Create a new TerraformBackend.
    ///
    /// With `None`, terraform is looked up in `PATH`. A bare name is also
    /// looked up in `PATH`; anything else must point at an existing file.
    pub fn new(binary: Option<&Path>) -> Result<Self> {
        let binary = find_terraform(binary)?;
        log::debug!("Using terraform at {}", binary.display());
        Ok(Self { binary })
    }

    /// Path of the terraform executable in use.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, invocation: &Invocation, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args)
            .current_dir(&invocation.working_dir)
            .envs(invocation.effective_env())
            .stdin(Stdio::null());
        cmd
    }

    /// Run a lifecycle command, streaming its output.
    fn run_streamed(
        &self,
        operation: Operation,
        invocation: &Invocation,
        args: &[&str],
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        log::debug!(
            "Running terraform {} in {}",
            args.join(" "),
            invocation.working_dir.display()
        );

        let mut child = self
            .command(invocation, args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn { operation, source })?;

        let tail = stream::pump(&mut child, output);
        let status = child.wait()?;
        let tail = tail?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                operation,
                exit: describe_exit(status),
                output: tail,
            })
        }
    }
}

impl Backend for TerraformBackend {
    fn init(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        let dir = provider_dir.to_string_lossy().into_owned();
        self.run_streamed(Operation::Init, invocation, &["init", dir.as_str()], output)
    }

    fn plan(
        &self,
        invocation: &Invocation,
        provider_dir: &Path,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        let out_flag = format!("-out={plan_name}");
        let dir = provider_dir.to_string_lossy().into_owned();
        self.run_streamed(
            Operation::Plan,
            invocation,
            &["plan", out_flag.as_str(), dir.as_str()],
            output,
        )
    }

    fn apply(
        &self,
        invocation: &Invocation,
        plan_name: &str,
        output: &mut (dyn Write + Send),
    ) -> Result<()> {
        self.run_streamed(
            Operation::Apply,
            invocation,
            &["apply", "-input=false", plan_name],
            output,
        )
    }

    fn destroy(&self, invocation: &Invocation, output: &mut (dyn Write + Send)) -> Result<()> {
        self.run_streamed(
            Operation::Destroy,
            invocation,
            &["destroy", "-force"],
            output,
        )
    }

    fn output(&self, invocation: &Invocation, key: &str) -> Result<String> {
        log::debug!(
            "Querying terraform output {} in {}",
            key,
            invocation.working_dir.display()
        );

        let out = self
            .command(invocation, &["output", "-json", key])
            .output()
            .map_err(|source| Error::Spawn {
                operation: Operation::Output,
                source,
            })?;

        if out.status.success() {
            return Ok(String::from_utf8_lossy(&out.stdout).into_owned());
        }

        let mut raw = String::from_utf8_lossy(&out.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&out.stderr));
        Err(Error::OutputQuery {
            key: key.to_string(),
            message: format!("terraform output exited with {}", describe_exit(out.status)),
            raw,
        })
    }
}

/// Find the terraform executable path.
fn find_terraform(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.components().count() > 1 => {
            if path.is_file() {
                Ok(path.to_path_buf())
            } else {
                Err(Error::TerraformNotFound {
                    searched: Some(path.to_path_buf()),
                })
            }
        }
        Some(name) => which::which(name).map_err(|_| Error::TerraformNotFound {
            searched: Some(name.to_path_buf()),
        }),
        None => which::which("terraform").map_err(|_| Error::TerraformNotFound { searched: None }),
    }
}

fn describe_exit(status: ExitStatus) -> String {
    status.to_string()
}
