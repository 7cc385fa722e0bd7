//! Credential discovery.
//!
//! The bearer token a platform needs is not handed out by any endpoint; it
//! sits somewhere inside the page's global objects. [`CredentialLocator`]
//! walks the globals matching a naming convention with [`scanner::search`],
//! a cycle-safe depth-first search bounded by a wall-clock deadline.

pub mod graph;
pub mod locator;
pub mod scanner;

pub use graph::{GraphObject, GraphValue, ObjectNode, ObjectRef, PropertyError};
pub use locator::{
    Credential, CredentialLocator, CredentialSource, DiscoveryError, LocatorOptions, Namespace,
    NamespaceProvider,
};
