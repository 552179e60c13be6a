/// Provider configuration for Rudder - Kubernetes manifests through kubectl
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Provider-level configuration, threaded as an immutable value into every
/// lifecycle operation.
///
/// `kubeconfig` and `kubeconfig_content` are mutually exclusive; supplying
/// both is a configuration error. With neither set, kubectl falls back to
/// its ambient configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Path to an existing kubeconfig file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Inline kubeconfig content, materialized to a temporary file per
    /// operation. Sensitive: never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig_content: Option<String>,

    /// kubectl context to select, passed as `--context`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubeconfig_context: Option<String>,
}

impl ProviderConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ProviderConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let has_path = self
            .kubeconfig
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty());
        let has_content = self
            .kubeconfig_content
            .as_ref()
            .is_some_and(|c| !c.is_empty());

        if has_path && has_content {
            anyhow::bail!(
                "both kubeconfig and kubeconfig_content are defined, \
                 please use only one of the parameters"
            );
        }

        Ok(())
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            kubeconfig: Some(PathBuf::from("~/.kube/config")),
            kubeconfig_content: None,
            kubeconfig_context: Some("my-cluster".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = ProviderConfig::example();
        assert!(config.validate().is_ok());

        config.kubeconfig_content = Some("apiVersion: v1".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(ProviderConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config: ProviderConfig =
            serde_yaml::from_str("kubeconfig: /tmp/kc\nkubeconfig_context: staging\n").unwrap();
        assert_eq!(config.kubeconfig.as_deref(), Some(Path::new("/tmp/kc")));
        assert_eq!(config.kubeconfig_context.as_deref(), Some("staging"));
        assert_eq!(config.kubeconfig_content, None);
    }
}
