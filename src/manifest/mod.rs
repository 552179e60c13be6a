/// Manifest lifecycle operations
///
/// Create applies a manifest through kubectl, reads back the self-links of
/// everything it produced and packs them into a [`CompositeId`]. Read checks
/// that those objects still exist, update re-applies the manifest, and
/// delete removes the objects in reverse creation order. Each operation
/// resolves its own kubeconfig and runs its subprocess calls sequentially.
use serde::Deserialize;
use tracing::info;

use crate::config::ProviderConfig;
use crate::error::{Error, MultiError, Result};
use crate::kubeconfig;
use crate::kubectl::{ClusterCli, Kubectl};
use crate::selflink::{CompositeId, ResourceLocator};

/// Shape of `kubectl get -f - -o json` output. Only the self-links are of
/// interest; everything else is ignored. Older clusters emit `selfLink`,
/// both spellings are accepted.
#[derive(Deserialize)]
struct GetResponse {
    #[serde(default)]
    items: Vec<GetItem>,
}

#[derive(Deserialize)]
struct GetItem {
    #[serde(default)]
    metadata: GetMetadata,
}

#[derive(Deserialize, Default)]
struct GetMetadata {
    #[serde(default, alias = "selfLink")]
    selflink: String,
}

/// What a read operation learned about a composite resource.
///
/// `present` is false when any constituent object came back empty, in which
/// case the host should drop the stored identity: partial disappearance of
/// a multi-object resource is treated as full disappearance. Per-locator
/// failures are collected in `errors`; a vanished verdict from the locators
/// that did succeed still stands.
#[derive(Debug)]
pub struct ReadOutcome {
    pub present: bool,
    pub errors: Vec<Error>,
}

impl ReadOutcome {
    /// Collapse the collected errors into a single aggregate, if any.
    pub fn into_error(self) -> Option<MultiError> {
        MultiError::from_vec(self.errors)
    }
}

/// Lifecycle adapter over one provider configuration.
pub struct ManifestLifecycle {
    config: ProviderConfig,
}

impl ManifestLifecycle {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    /// Apply the manifest and derive the new resource's identity from the
    /// self-links of the objects it produced.
    pub async fn create(&self, manifest: &str) -> Result<CompositeId> {
        let kubeconfig = kubeconfig::resolve(&self.config)?;
        let cli = self.cli(kubeconfig.path());
        create_with(&cli, manifest).await
    }

    /// Check that every object behind the stored identity still exists.
    ///
    /// Only kubeconfig resolution can fail outright; per-locator failures
    /// are collected in the returned [`ReadOutcome`].
    pub async fn read(&self, id: &CompositeId) -> Result<ReadOutcome> {
        let kubeconfig = kubeconfig::resolve(&self.config)?;
        let cli = self.cli(kubeconfig.path());
        Ok(read_with(&cli, id).await)
    }

    /// Re-apply the manifest. The identity derived at creation is immutable,
    /// so nothing is read back.
    pub async fn update(&self, manifest: &str) -> Result<()> {
        let kubeconfig = kubeconfig::resolve(&self.config)?;
        let cli = self.cli(kubeconfig.path());
        info!("Re-applying manifest");
        cli.apply(manifest).await
    }

    /// Delete every object behind the stored identity, best-effort, in
    /// reverse creation order.
    pub async fn delete(&self, id: &CompositeId) -> Result<()> {
        let kubeconfig = kubeconfig::resolve(&self.config)?;
        let cli = self.cli(kubeconfig.path());
        delete_with(&cli, id).await
    }

    fn cli(&self, kubeconfig: Option<&std::path::Path>) -> Kubectl {
        let context = self
            .config
            .kubeconfig_context
            .as_deref()
            .filter(|c| !c.is_empty());
        Kubectl::new(kubeconfig, context)
    }
}

/// Create against an arbitrary cluster CLI. Fail-fast: the stored identity
/// must be derived from a fully successful apply-and-discover sequence.
pub async fn create_with<C: ClusterCli + ?Sized>(cli: &C, manifest: &str) -> Result<CompositeId> {
    info!("Applying manifest");
    cli.apply(manifest).await?;

    let stdout = cli.get_json(manifest).await?;
    let response: GetResponse = serde_json::from_str(&stdout)?;

    if response.items.is_empty() {
        return Err(Error::NoResourcesCreated);
    }

    let mut selflinks = Vec::with_capacity(response.items.len());
    for item in &response.items {
        if item.metadata.selflink.is_empty() {
            return Err(Error::MissingSelflink(stdout));
        }
        selflinks.push(item.metadata.selflink.clone());
    }

    info!("Created {} resource(s)", selflinks.len());

    Ok(CompositeId::from_selflinks(&selflinks))
}

/// Read against an arbitrary cluster CLI. Best-effort: every locator is
/// queried even after failures.
pub async fn read_with<C: ClusterCli + ?Sized>(cli: &C, id: &CompositeId) -> ReadOutcome {
    let mut present = true;
    let mut errors = Vec::new();

    for selflink in id.selflinks() {
        let locator = match ResourceLocator::parse(selflink) {
            Ok(locator) => locator,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        match cli.get_raw(&locator).await {
            Ok(stdout) => {
                if stdout.trim().is_empty() {
                    info!("Resource {} no longer exists", locator);
                    present = false;
                }
            }
            Err(e) => errors.push(e),
        }
    }

    ReadOutcome { present, errors }
}

/// Delete against an arbitrary cluster CLI, last-created object first.
/// Later objects may depend on earlier ones, so teardown runs backwards.
/// Best-effort: remaining deletions are attempted even after a failure.
pub async fn delete_with<C: ClusterCli + ?Sized>(cli: &C, id: &CompositeId) -> Result<()> {
    let mut errors = Vec::new();

    for selflink in id.selflinks().rev() {
        if let Err(e) = delete_one(cli, selflink).await {
            errors.push(e);
        }
    }

    match MultiError::from_vec(errors) {
        Some(multi) => Err(multi.into()),
        None => Ok(()),
    }
}

async fn delete_one<C: ClusterCli + ?Sized>(cli: &C, selflink: &str) -> Result<()> {
    let locator = ResourceLocator::parse(selflink)?;
    info!("Deleting resource {}", locator);
    cli.delete(&locator).await
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::{ExecCause, ExecError};

    /// In-memory stand-in for kubectl, recording every call in order.
    #[derive(Default)]
    struct MockCli {
        calls: Mutex<Vec<String>>,
        get_json_response: String,
        fail_apply: bool,
        empty_resources: HashSet<String>,
        failing_resources: HashSet<String>,
    }

    impl MockCli {
        fn with_get_json(response: &str) -> Self {
            Self {
                get_json_response: response.to_string(),
                ..Self::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn failure(what: &str) -> Error {
            ExecError {
                command: "kubectl".to_string(),
                args: vec![what.to_string()],
                cause: ExecCause::Spawn(std::io::Error::other("mock failure")),
                stderr: String::new(),
            }
            .into()
        }
    }

    #[async_trait]
    impl ClusterCli for MockCli {
        async fn apply(&self, _manifest: &str) -> Result<()> {
            self.record("apply".to_string());
            if self.fail_apply {
                return Err(Self::failure("apply"));
            }
            Ok(())
        }

        async fn get_json(&self, _manifest: &str) -> Result<String> {
            self.record("get_json".to_string());
            Ok(self.get_json_response.clone())
        }

        async fn get_raw(&self, locator: &ResourceLocator) -> Result<String> {
            self.record(format!("get {}", locator.resource));
            if self.failing_resources.contains(&locator.resource) {
                return Err(Self::failure("get"));
            }
            if self.empty_resources.contains(&locator.resource) {
                return Ok("  \n".to_string());
            }
            Ok(format!("NAME   READY\n{}   1/1\n", locator.resource))
        }

        async fn delete(&self, locator: &ResourceLocator) -> Result<()> {
            self.record(format!("delete {}", locator.resource));
            if self.failing_resources.contains(&locator.resource) {
                return Err(Self::failure("delete"));
            }
            Ok(())
        }
    }

    fn list_response(selflinks: &[&str]) -> String {
        let items: Vec<serde_json::Value> = selflinks
            .iter()
            .map(|s| serde_json::json!({"metadata": {"selfLink": s}}))
            .collect();
        serde_json::json!({"kind": "List", "items": items}).to_string()
    }

    #[tokio::test]
    async fn test_create_packs_selflinks_in_order() {
        let cli = MockCli::with_get_json(&list_response(&[
            "/api/v1/namespaces/foo",
            "/apis/apps/v1/namespaces/foo/deployments/bar",
        ]));

        let id = create_with(&cli, "kind: List").await.unwrap();
        assert_eq!(
            id.as_str(),
            "/api/v1/namespaces/foo /apis/apps/v1/namespaces/foo/deployments/bar"
        );
        assert_eq!(cli.calls(), ["apply", "get_json"]);
    }

    #[tokio::test]
    async fn test_create_lowercase_selflink_spelling() {
        let cli =
            MockCli::with_get_json(r#"{"items": [{"metadata": {"selflink": "/api/v1/nodes/n1"}}]}"#);
        let id = create_with(&cli, "kind: Node").await.unwrap();
        assert_eq!(id.as_str(), "/api/v1/nodes/n1");
    }

    #[tokio::test]
    async fn test_create_empty_items_fails() {
        let cli = MockCli::with_get_json(r#"{"items": []}"#);
        let result = create_with(&cli, "kind: List").await;
        assert!(matches!(result, Err(Error::NoResourcesCreated)));
    }

    #[tokio::test]
    async fn test_create_missing_selflink_fails() {
        let cli = MockCli::with_get_json(r#"{"items": [{"metadata": {}}]}"#);
        let result = create_with(&cli, "kind: List").await;
        assert!(matches!(result, Err(Error::MissingSelflink(_))));
    }

    #[tokio::test]
    async fn test_create_malformed_json_fails() {
        let cli = MockCli::with_get_json("not json");
        let result = create_with(&cli, "kind: List").await;
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_create_apply_failure_short_circuits() {
        let cli = MockCli {
            fail_apply: true,
            ..MockCli::default()
        };
        let result = create_with(&cli, "kind: List").await;
        assert!(matches!(result, Err(Error::Exec(_))));
        assert_eq!(cli.calls(), ["apply"]);
    }

    #[tokio::test]
    async fn test_delete_runs_in_reverse_creation_order() {
        let cli = MockCli::default();
        let id = CompositeId::new(
            "/api/v1/namespaces/foo /apis/apps/v1/namespaces/foo/deployments/bar",
        );

        delete_with(&cli, &id).await.unwrap();
        assert_eq!(cli.calls(), ["delete deployments/bar", "delete namespaces/foo"]);
    }

    #[tokio::test]
    async fn test_delete_is_best_effort_and_aggregates() {
        let cli = MockCli {
            failing_resources: ["deployments/bar".to_string()].into(),
            ..MockCli::default()
        };
        let id = CompositeId::new(
            "/api/v1/namespaces/foo /apis/apps/v1/namespaces/foo/deployments/bar",
        );

        let result = delete_with(&cli, &id).await;

        // Both deletions were attempted, last-created first
        assert_eq!(cli.calls(), ["delete deployments/bar", "delete namespaces/foo"]);

        // The aggregate holds exactly the one failure
        match result {
            Err(Error::Multi(multi)) => {
                assert_eq!(multi.len(), 1);
                assert!(matches!(multi.errors()[0], Error::Exec(_)));
            }
            other => panic!("expected aggregate error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_delete_invalid_segment_collected_others_deleted() {
        let cli = MockCli::default();
        let id = CompositeId::new("bad /api/v1/namespaces/foo");

        let result = delete_with(&cli, &id).await;
        assert_eq!(cli.calls(), ["delete namespaces/foo"]);
        match result {
            Err(Error::Multi(multi)) => {
                assert!(matches!(multi.errors()[0], Error::InvalidId(_)));
            }
            other => panic!("expected aggregate error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_read_partial_emptiness_clears_identity() {
        let cli = MockCli {
            empty_resources: ["deployments/bar".to_string()].into(),
            ..MockCli::default()
        };
        let id = CompositeId::new(
            "/api/v1/namespaces/foo /apis/apps/v1/namespaces/foo/deployments/bar",
        );

        let outcome = read_with(&cli, &id).await;
        // One of two objects is gone: the whole composite is treated as gone
        assert!(!outcome.present);
        assert!(outcome.errors.is_empty());
        assert_eq!(cli.calls(), ["get namespaces/foo", "get deployments/bar"]);
    }

    #[tokio::test]
    async fn test_read_collects_errors_without_clearing() {
        let cli = MockCli {
            failing_resources: ["deployments/bar".to_string()].into(),
            ..MockCli::default()
        };
        let id = CompositeId::new(
            "/api/v1/namespaces/foo /apis/apps/v1/namespaces/foo/deployments/bar",
        );

        let outcome = read_with(&cli, &id).await;
        assert!(outcome.present);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.into_error().is_some());
    }

    #[tokio::test]
    async fn test_read_error_does_not_mask_vanished_verdict() {
        let cli = MockCli {
            failing_resources: ["namespaces/foo".to_string()].into(),
            empty_resources: ["deployments/bar".to_string()].into(),
            ..MockCli::default()
        };
        let id = CompositeId::new(
            "/api/v1/namespaces/foo /apis/apps/v1/namespaces/foo/deployments/bar",
        );

        let outcome = read_with(&cli, &id).await;
        assert!(!outcome.present);
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_read_invalid_segment_collected() {
        let cli = MockCli::default();
        let id = CompositeId::new("bad");

        let outcome = read_with(&cli, &id).await;
        assert!(outcome.present);
        assert_eq!(outcome.errors.len(), 1);
        assert!(matches!(outcome.errors[0], Error::InvalidId(_)));
        assert!(cli.calls().is_empty());
    }

    #[tokio::test]
    async fn test_kubeconfig_conflict_short_circuits_before_any_subprocess() {
        let lifecycle = ManifestLifecycle::new(ProviderConfig {
            kubeconfig: Some("/tmp/kc".into()),
            kubeconfig_content: Some("apiVersion: v1".to_string()),
            kubeconfig_context: None,
        });

        let result = lifecycle.create("kind: List").await;
        assert!(matches!(result, Err(Error::KubeconfigConflict)));
    }
}
