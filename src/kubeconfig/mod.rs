/// Kubeconfig resolution
///
/// The provider accepts credentials either as a path to an existing
/// kubeconfig or as inline file content. Inline content is materialized to a
/// temporary file for the duration of one lifecycle operation and removed
/// again when the operation finishes, success or failure.
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};

/// A usable kubeconfig location for one operation.
///
/// When the config carried inline content, this owns the backing temporary
/// file; dropping the value removes it. Holding the value for the whole
/// operation gives release-exactly-once on every exit path.
#[derive(Debug)]
pub struct ResolvedKubeconfig {
    path: Option<PathBuf>,
    // Kept alive for its Drop impl, which deletes the file.
    _temp: Option<NamedTempFile>,
}

impl ResolvedKubeconfig {
    /// The path to pass as `--kubeconfig`, or `None` to omit the flag and
    /// let kubectl fall back to its ambient configuration.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Resolve the configured credentials into a kubeconfig path.
///
/// Supplying both a path and inline content is a configuration error. At
/// most one temporary file is created per call.
pub fn resolve(config: &ProviderConfig) -> Result<ResolvedKubeconfig> {
    let path = config.kubeconfig.as_deref().filter(|p| !p.as_os_str().is_empty());
    let content = config
        .kubeconfig_content
        .as_deref()
        .filter(|c| !c.is_empty());

    match (path, content) {
        (Some(_), Some(_)) => Err(Error::KubeconfigConflict),
        (None, Some(content)) => {
            let mut tempfile = tempfile::Builder::new()
                .prefix("kubeconfig_")
                .tempfile()
                .map_err(Error::KubeconfigMaterialize)?;
            tempfile
                .write_all(content.as_bytes())
                .map_err(Error::KubeconfigMaterialize)?;
            tempfile.flush().map_err(Error::KubeconfigMaterialize)?;

            debug!(
                "Materialized inline kubeconfig to {}",
                tempfile.path().display()
            );

            Ok(ResolvedKubeconfig {
                path: Some(tempfile.path().to_path_buf()),
                _temp: Some(tempfile),
            })
        }
        (Some(path), None) => Ok(ResolvedKubeconfig {
            path: Some(path.to_path_buf()),
            _temp: None,
        }),
        (None, None) => Ok(ResolvedKubeconfig {
            path: None,
            _temp: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(
        kubeconfig: Option<&str>,
        content: Option<&str>,
    ) -> ProviderConfig {
        ProviderConfig {
            kubeconfig: kubeconfig.map(PathBuf::from),
            kubeconfig_content: content.map(String::from),
            kubeconfig_context: None,
        }
    }

    #[test]
    fn test_both_set_is_a_conflict() {
        let result = resolve(&config(Some("/tmp/kc"), Some("apiVersion: v1")));
        assert!(matches!(result, Err(Error::KubeconfigConflict)));
    }

    #[test]
    fn test_inline_content_materialized_and_removed() {
        let resolved = resolve(&config(None, Some("apiVersion: v1\nkind: Config\n"))).unwrap();
        let path = resolved.path().unwrap().to_path_buf();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "apiVersion: v1\nkind: Config\n");

        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn test_path_passes_through() {
        let resolved = resolve(&config(Some("/home/user/.kube/config"), None)).unwrap();
        assert_eq!(
            resolved.path(),
            Some(Path::new("/home/user/.kube/config"))
        );
    }

    #[test]
    fn test_neither_set_omits_the_flag() {
        let resolved = resolve(&config(None, None)).unwrap();
        assert_eq!(resolved.path(), None);
    }

    #[test]
    fn test_empty_strings_count_as_unset() {
        let resolved = resolve(&config(Some(""), Some(""))).unwrap();
        assert_eq!(resolved.path(), None);
    }
}
