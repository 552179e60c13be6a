/// kubectl invocation behind a narrow seam
///
/// The lifecycle adapter never shells out directly; it talks to the cluster
/// through [`ClusterCli`], so tests can substitute a mock and an alternative
/// native-client implementation could satisfy the same contract.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::selflink::ResourceLocator;
use crate::utils::command::CommandBuilder;

/// The four cluster operations the lifecycle adapter needs.
#[async_trait]
pub trait ClusterCli {
    /// Apply a manifest (`apply -f -`, manifest on standard input).
    async fn apply(&self, manifest: &str) -> Result<()>;

    /// Look up the objects a manifest produced, as structured output
    /// (`get -f - -o json`).
    async fn get_json(&self, manifest: &str) -> Result<String>;

    /// Fetch one object, returning empty output when it does not exist
    /// (`get --ignore-not-found`).
    async fn get_raw(&self, locator: &ResourceLocator) -> Result<String>;

    /// Delete one object.
    async fn delete(&self, locator: &ResourceLocator) -> Result<()>;
}

/// Production [`ClusterCli`] backed by the kubectl binary.
pub struct Kubectl {
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
}

impl Kubectl {
    pub fn new(kubeconfig: Option<&Path>, context: Option<&str>) -> Self {
        Self {
            kubeconfig: kubeconfig.map(Path::to_path_buf),
            context: context.map(str::to_string),
        }
    }

    /// Check if kubectl is installed
    pub async fn check_installed() -> anyhow::Result<()> {
        crate::utils::command::check_tool_installed(
            "kubectl",
            &["version", "--client"],
            "https://kubernetes.io/docs/tasks/tools/",
        )
        .await
    }

    /// Build a kubectl command with the global `--kubeconfig` and
    /// `--context` flags prepended when configured.
    fn command<I, S>(&self, args: I) -> CommandBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = CommandBuilder::new("kubectl");
        if let Some(kubeconfig) = &self.kubeconfig {
            builder = builder
                .arg("--kubeconfig")
                .arg(kubeconfig.to_string_lossy());
        }
        if let Some(context) = &self.context {
            builder = builder.arg("--context").arg(context);
        }
        builder.args(args)
    }

    fn locator_args(verb_args: &[&str], locator: &ResourceLocator) -> Vec<String> {
        let mut args: Vec<String> = verb_args.iter().map(|a| a.to_string()).collect();
        args.push(locator.resource.clone());
        if let Some(namespace) = &locator.namespace {
            args.push("-n".to_string());
            args.push(namespace.clone());
        }
        args
    }
}

#[async_trait]
impl ClusterCli for Kubectl {
    async fn apply(&self, manifest: &str) -> Result<()> {
        debug!("Running kubectl apply");
        self.command(["apply", "-f", "-"])
            .stdin(manifest)
            .run_silent()
            .await
    }

    async fn get_json(&self, manifest: &str) -> Result<String> {
        debug!("Running kubectl get -o json");
        self.command(["get", "-f", "-", "-o", "json"])
            .stdin(manifest)
            .run()
            .await
    }

    async fn get_raw(&self, locator: &ResourceLocator) -> Result<String> {
        debug!("Running kubectl get for {}", locator);
        self.command(Self::locator_args(&["get", "--ignore-not-found"], locator))
            .run()
            .await
    }

    async fn delete(&self, locator: &ResourceLocator) -> Result<()> {
        debug!("Running kubectl delete for {}", locator);
        self.command(Self::locator_args(&["delete"], locator))
            .run_silent()
            .await
    }
}
