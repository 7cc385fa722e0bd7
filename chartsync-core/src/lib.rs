//! Chartsync Core Library
//!
//! Backup model, credential discovery and sync pipeline for moving chart
//! themes and drawing templates between charting platforms.

pub mod api;
pub mod catalog;
pub mod discovery;
pub mod models;
mod pacing;
pub mod pipeline;
pub mod portable;
pub mod progress;
pub mod selection;
pub mod session;
pub mod settings;

#[cfg(test)]
mod testing;

pub use api::{ApiError, DestinationApi, FxReplayClient, Platform, SourceApi, TradingViewClient};
pub use catalog::{
    CatalogBuilder, CatalogError, CatalogFailure, CatalogOutcome, CatalogReport, FetchTarget,
};
pub use discovery::{
    Credential, CredentialLocator, CredentialSource, DiscoveryError, LocatorOptions, Namespace,
    NamespaceProvider,
};
pub use models::{
    BackupDocument, Category, DocumentMeta, EntityId, Payload, Scope, Templates, ToolId, ToolKind,
};
pub use pipeline::{PipelineState, SyncError, SyncFailure, SyncPipeline, SyncReport};
pub use portable::{ExportError, ImportFormatError, MergeSummary, PortableDocument};
pub use progress::{CancelFlag, NoopObserver, Observer, Progress};
pub use selection::{Group, SelectionModel};
pub use session::{Session, SessionError};
pub use settings::{MemorySettings, SettingsError, SettingsStore};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
