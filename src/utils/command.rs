/// Command execution utilities to reduce code duplication
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{ExecCause, ExecError, Result};

/// Result from command execution with captured output
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    status: std::process::ExitStatus,
    command: String,
    args: Vec<String>,
}

impl CommandOutput {
    /// Return stdout if successful, otherwise a typed execution error
    /// carrying the command line and captured stderr.
    pub fn into_result(self) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(ExecError {
                command: self.command,
                args: self.args,
                cause: ExecCause::Exited(self.status),
                stderr: self.stderr,
            }
            .into())
        }
    }
}

/// Builder for executing external commands with common patterns
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    stdin_data: Option<String>,
}

impl CommandBuilder {
    /// Create a new command builder
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_data: None,
        }
    }

    /// Add a single argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pipe the given text to the process on standard input
    pub fn stdin(mut self, data: impl Into<String>) -> Self {
        self.stdin_data = Some(data.into());
        self
    }

    fn exec_error(&self, err: std::io::Error) -> ExecError {
        ExecError {
            command: self.program.clone(),
            args: self.args.clone(),
            cause: ExecCause::Spawn(err),
            stderr: String::new(),
        }
    }

    /// Execute and return raw output
    pub async fn output(self) -> Result<CommandOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = if let Some(data) = &self.stdin_data {
            command.stdin(Stdio::piped());
            let mut child = command.spawn().map_err(|e| self.exec_error(e))?;

            // stdin is piped, so take() cannot fail here
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(data.as_bytes())
                    .await
                    .map_err(|e| self.exec_error(e))?;
            }

            child
                .wait_with_output()
                .await
                .map_err(|e| self.exec_error(e))?
        } else {
            command.stdin(Stdio::null());
            command.output().await.map_err(|e| self.exec_error(e))?
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            status: output.status,
            command: self.program,
            args: self.args,
        })
    }

    /// Execute and return stdout on success, error on failure
    pub async fn run(self) -> Result<String> {
        self.output().await?.into_result()
    }

    /// Execute and ignore output (just check success)
    pub async fn run_silent(self) -> Result<()> {
        self.output().await?.into_result().map(|_| ())
    }
}

/// Check if a command-line tool is installed
pub async fn check_tool_installed(
    tool_name: &str,
    version_args: &[&str],
    install_url: &str,
) -> anyhow::Result<()> {
    let output = CommandBuilder::new(tool_name)
        .args(version_args.iter().copied())
        .output()
        .await;

    match output {
        Ok(out) if out.success => Ok(()),
        _ => anyhow::bail!(
            "{} is not installed or not in PATH. Please install from {}",
            tool_name,
            install_url
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_command_builder_basic() {
        let output = CommandBuilder::new("echo")
            .arg("test")
            .output()
            .await
            .unwrap();

        assert!(output.success);
        assert!(output.stdout.contains("test"));
    }

    #[tokio::test]
    async fn test_command_builder_stdin() {
        let stdout = CommandBuilder::new("cat")
            .stdin("piped input")
            .run()
            .await
            .unwrap();

        assert_eq!(stdout, "piped input");
    }

    #[tokio::test]
    async fn test_failure_captures_stderr() {
        let result = CommandBuilder::new("sh")
            .args(["-c", "echo boom >&2; exit 3"])
            .run()
            .await;

        match result {
            Err(Error::Exec(e)) => {
                assert_eq!(e.command, "sh");
                assert!(e.stderr.contains("boom"));
                assert!(e.to_string().contains("boom"));
            }
            other => panic!("expected execution error, got {:?}", other.map(|_| ())),
        }
    }
}
