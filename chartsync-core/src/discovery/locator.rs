//! Finds the platform's bearer token in the host page's global objects.

use async_trait::async_trait;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

use super::graph::GraphValue;
use super::scanner::{search, string_named};

pub const DEFAULT_PREFIX: &str = "tradingview_";
pub const DEFAULT_KEY: &str = "accessToken";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Opaque bearer token. Lives for one migration session and is never stored.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First few characters followed by an ellipsis.
    pub fn masked(&self) -> String {
        let visible: String = self.0.chars().take(6).collect();
        format!("{}…", visible)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

/// Credential discovery came back empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Access token not found: search gave up after {0:?}")]
    Timeout(Duration),

    #[error("Access token not found in {candidates} candidate object(s)")]
    NotFound { candidates: usize },
}

/// Supplies the top-level bindings of a host namespace.
pub trait NamespaceProvider: Send + Sync {
    /// Name/value pairs in the namespace's enumeration order.
    fn bindings(&self) -> Vec<(String, GraphValue)>;
}

/// A fixed set of bindings, e.g. a snapshot of a page's globals.
#[derive(Clone, Default)]
pub struct Namespace {
    bindings: Vec<(String, GraphValue)>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<GraphValue>) -> Self {
        self.bindings.push((name.into(), value.into()));
        self
    }

    /// Builds a namespace from a JSON object snapshot; each member is a binding.
    pub fn from_json(snapshot: serde_json::Value) -> Option<Self> {
        match snapshot {
            serde_json::Value::Object(members) => Some(Self {
                bindings: members
                    .into_iter()
                    .map(|(name, value)| (name, GraphValue::from_json(value)))
                    .collect(),
            }),
            _ => None,
        }
    }
}

impl NamespaceProvider for Namespace {
    fn bindings(&self) -> Vec<(String, GraphValue)> {
        self.bindings.clone()
    }
}

/// Anything that can hand the pipeline a credential on demand.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credential(&self) -> Result<Credential, DiscoveryError>;
}

#[derive(Debug, Clone)]
pub struct LocatorOptions {
    /// Only bindings whose name starts with this are searched
    pub prefix: String,
    /// Property name holding the token
    pub key: String,
    /// Total budget across all candidate roots
    pub timeout: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            key: DEFAULT_KEY.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Searches every namespace binding matching the prefix for the token.
pub struct CredentialLocator<N> {
    namespace: N,
    options: LocatorOptions,
}

impl<N: NamespaceProvider> CredentialLocator<N> {
    pub fn new(namespace: N, options: LocatorOptions) -> Self {
        Self { namespace, options }
    }

    pub fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Searches with the configured timeout.
    pub async fn locate(&self) -> Result<Credential, DiscoveryError> {
        self.locate_within(self.options.timeout).await
    }

    /// Searches candidate roots in namespace order, yielding to the runtime
    /// after each one. The deadline is shared by all candidates; each gets
    /// its own visited set.
    pub async fn locate_within(&self, timeout: Duration) -> Result<Credential, DiscoveryError> {
        let deadline = Instant::now() + timeout;
        let predicate = string_named(&self.options.key);

        let candidates: Vec<(String, GraphValue)> = self
            .namespace
            .bindings()
            .into_iter()
            .filter(|(name, _)| name.starts_with(&self.options.prefix))
            .collect();

        tracing::debug!(
            "Searching {} candidate object(s) for '{}'",
            candidates.len(),
            self.options.key
        );

        for (name, root) in &candidates {
            if Instant::now() >= deadline {
                break;
            }
            if let Some(GraphValue::String(token)) = search(root, &predicate, deadline) {
                tracing::debug!("Access token found under '{}'", name);
                return Ok(Credential::new(token));
            }
            tokio::task::yield_now().await;
        }

        if Instant::now() >= deadline {
            Err(DiscoveryError::Timeout(timeout))
        } else {
            Err(DiscoveryError::NotFound {
                candidates: candidates.len(),
            })
        }
    }
}

#[async_trait]
impl<N: NamespaceProvider> CredentialSource for CredentialLocator<N> {
    async fn credential(&self) -> Result<Credential, DiscoveryError> {
        self.locate().await
    }
}
