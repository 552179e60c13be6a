/// Error types for manifest lifecycle operations
use std::fmt;
use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("both kubeconfig and kubeconfig_content are defined, please use only one of the parameters")]
    KubeconfigConflict,

    #[error("writing kubeconfig to a temporary file: {0}")]
    KubeconfigMaterialize(#[source] std::io::Error),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("decoding kubectl response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no resources created")]
    NoResourcesCreated,

    #[error("could not parse self-link from response {0}")]
    MissingSelflink(String),

    #[error("invalid resource id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Multi(#[from] MultiError),
}

/// A subprocess exited nonzero (or failed to start). Carries the full
/// command line and captured stderr for the operator.
#[derive(Debug)]
pub struct ExecError {
    pub command: String,
    pub args: Vec<String>,
    pub cause: ExecCause,
    pub stderr: String,
}

#[derive(Debug)]
pub enum ExecCause {
    /// The process could not be spawned or waited on.
    Spawn(std::io::Error),
    /// The process ran and exited nonzero.
    Exited(ExitStatus),
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.command, self.args.join(" "))?;
        match &self.cause {
            ExecCause::Spawn(e) => write!(f, ": {}", e)?,
            ExecCause::Exited(status) => write!(f, ": {}", status)?,
        }
        // stderr only when the tool actually said something
        if !self.stderr.is_empty() {
            write!(f, ": {}", self.stderr.trim_end())?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            ExecCause::Spawn(e) => Some(e),
            ExecCause::Exited(_) => None,
        }
    }
}

/// Ordered, non-empty list of failures from a best-effort multi-resource
/// operation. Read and delete attempt every locator and report everything
/// that went wrong instead of stopping at the first failure.
#[derive(Debug)]
pub struct MultiError(Vec<Error>);

impl MultiError {
    /// Wrap the collected errors, or `None` when nothing failed.
    pub fn from_vec(errors: Vec<Error>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn errors(&self) -> &[Error] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s): ", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for MultiError {}
