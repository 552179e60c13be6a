/// Rudder - Kubernetes manifests through kubectl
///
/// A thin lifecycle adapter: apply a manifest, derive a stable identity from
/// the self-links of what it created, and use that identity to check on or
/// tear down the objects later. All cluster access goes through the kubectl
/// binary.
pub mod config;
pub mod error;
pub mod kubeconfig;
pub mod kubectl;
pub mod manifest;
pub mod selflink;
pub mod utils;

pub use config::ProviderConfig;
pub use error::{Error, MultiError, Result};
pub use manifest::{ManifestLifecycle, ReadOutcome};
pub use selflink::{CompositeId, ResourceLocator};
