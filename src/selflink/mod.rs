/// Self-link identifier codec
///
/// kubectl reports each created object with a self-link, a path-like string
/// such as `/apis/apps/v1/namespaces/foo/deployments/bar`. The raw self-links
/// of everything produced by one manifest are packed verbatim into a single
/// composite id, which the host persists as the resource's identity. Read and
/// delete unpack that id and address each object as `<kind>/<name>` plus an
/// optional namespace.
use std::fmt;

use crate::error::{Error, Result};

/// When packing multiple self-links into a single resource id, separate them
/// with this value.
const SELFLINK_DELIM: char = ' ';

/// One addressable cluster object, derived from a self-link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLocator {
    /// `<kind>/<name>`, as accepted by `kubectl get` and `kubectl delete`
    pub resource: String,

    /// Namespace, when the self-link carried one
    pub namespace: Option<String>,
}

impl ResourceLocator {
    /// Parse a self-link into a locator.
    ///
    /// The resource is the last two path segments joined by `/`; the
    /// namespace is the segment following a literal `namespaces` segment,
    /// if any. Self-links may percent-encode special characters, so the
    /// resource part is decoded before use.
    pub fn parse(selflink: &str) -> Result<Self> {
        let parts: Vec<&str> = selflink.split('/').collect();
        if parts.len() < 2 {
            return Err(Error::InvalidId(selflink.to_string()));
        }

        let resource = format!("{}/{}", parts[parts.len() - 2], parts[parts.len() - 1]);

        let namespace = parts
            .iter()
            .position(|part| *part == "namespaces")
            .and_then(|i| parts.get(i + 1))
            .map(|ns| ns.to_string());

        let resource = urlencoding::decode(&resource)
            .map_err(|_| Error::InvalidId(selflink.to_string()))?
            .into_owned();

        Ok(Self {
            resource,
            namespace,
        })
    }
}

impl fmt::Display for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} (namespace {})", self.resource, ns),
            None => write!(f, "{}", self.resource),
        }
    }
}

/// The persisted identity of one applied manifest: all resulting self-links
/// joined by a fixed delimiter, in creation-report order. The raw string is
/// stored verbatim so that splitting and re-joining is lossless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeId(String);

impl CompositeId {
    /// Wrap an identity string previously produced by [`from_selflinks`].
    ///
    /// [`from_selflinks`]: CompositeId::from_selflinks
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Pack self-links in creation-report order.
    pub fn from_selflinks(selflinks: &[String]) -> Self {
        Self(selflinks.join(&SELFLINK_DELIM.to_string()))
    }

    /// Unpack into the raw self-links, preserving order.
    pub fn selflinks(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split(SELFLINK_DELIM)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
