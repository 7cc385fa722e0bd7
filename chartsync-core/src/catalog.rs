//! Builds a [`BackupDocument`] by reading every theme and template off a
//! source platform.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::api::{ApiError, SourceApi};
use crate::discovery::{Credential, CredentialSource, DiscoveryError};
use crate::models::{BackupDocument, DocumentMeta, EntityId, Scope, ToolId, ToolKind};
use crate::pacing::Pacer;
use crate::progress::{CancelFlag, Observer, Progress};

pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(10);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Cannot read from source: {0}")]
    Auth(#[from] DiscoveryError),
}

/// What a recorded failure was trying to read.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    Listing(Scope),
    Entity(EntityId),
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::Listing(scope) => write!(f, "listing of {}", scope),
            FetchTarget::Entity(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogFailure {
    pub target: FetchTarget,
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogReport {
    pub failures: Vec<CatalogFailure>,
    pub cancelled: bool,
}

impl CatalogReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// The document built so far plus everything that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogOutcome {
    pub document: BackupDocument,
    pub report: CatalogReport,
}

/// Reads themes and templates sequentially, pausing between requests.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    delay: Duration,
}

impl Default for CatalogBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_DELAY)
    }
}

impl CatalogBuilder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Lists and fetches every theme (when `include_themes`) and every
    /// template of each kind in `tools`.
    ///
    /// A failed listing or fetch is recorded and the build moves on; only a
    /// missing credential stops it before any request is made. Progress is
    /// reported after each theme and after each tool kind.
    pub async fn build_catalog(
        &self,
        source: &dyn SourceApi,
        credentials: &dyn CredentialSource,
        tools: &[ToolKind],
        include_themes: bool,
        observer: &dyn Observer,
        cancel: &CancelFlag,
    ) -> Result<CatalogOutcome, CatalogError> {
        let credential = if source.requires_credential() {
            observer.on_status("Looking for access token");
            Some(credentials.credential().await?)
        } else {
            None
        };
        let credential = credential.as_ref();

        let mut document = BackupDocument::new();
        let mut report = CatalogReport::default();
        let mut pacer = Pacer::new(self.delay);

        let mut theme_names = Vec::new();
        if include_themes && !source.lists(&Scope::Themes) {
            tracing::info!("{} keeps no theme list; fetching templates only", source.platform());
        } else if include_themes {
            observer.on_status("Listing themes");
            observer.on_progress(Progress::Indeterminate);
            pacer.pace().await;
            match source.list(&Scope::Themes, credential).await {
                Ok(names) => theme_names = names,
                Err(error) => record(&mut report, FetchTarget::Listing(Scope::Themes), error),
            }
        }

        let total = theme_names.len() + tools.len();
        let mut done = 0;

        for name in theme_names {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            observer.on_status(&format!("Fetching theme {}", name));
            pacer.pace().await;
            match source.fetch(&Scope::Themes, &name, credential).await {
                Ok(payload) => {
                    document.themes.insert(name, payload);
                }
                Err(error) => record(&mut report, FetchTarget::Entity(EntityId::theme(name)), error),
            }
            done += 1;
            observer.on_progress(Progress::of(done, total));
        }

        for kind in tools {
            if report.cancelled || cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let scope = Scope::Tool(ToolId::from(*kind));
            self.fetch_tool(
                source,
                &scope,
                credential,
                &mut document,
                &mut report,
                &mut pacer,
                observer,
                cancel,
            )
            .await;
            done += 1;
            observer.on_progress(Progress::of(done, total));
        }

        document.meta = Some(DocumentMeta::generated_now(
            source.platform().to_string(),
            source.user_id(),
        ));

        tracing::info!(
            "Catalog built: {} theme(s), {} template(s), {} failure(s)",
            document.themes.len(),
            document.template_count(),
            report.failures.len()
        );

        Ok(CatalogOutcome { document, report })
    }

    #[allow(clippy::too_many_arguments)]
    async fn fetch_tool(
        &self,
        source: &dyn SourceApi,
        scope: &Scope,
        credential: Option<&Credential>,
        document: &mut BackupDocument,
        report: &mut CatalogReport,
        pacer: &mut Pacer,
        observer: &dyn Observer,
        cancel: &CancelFlag,
    ) {
        observer.on_status(&format!("Listing {} templates", scope));
        observer.on_progress(Progress::Indeterminate);
        pacer.pace().await;
        let names = match source.list(scope, credential).await {
            Ok(names) => names,
            Err(error) => {
                record(report, FetchTarget::Listing(scope.clone()), error);
                return;
            }
        };

        let Some(tool) = scope.tool() else {
            return;
        };
        for name in names {
            if cancel.is_cancelled() {
                report.cancelled = true;
                return;
            }
            pacer.pace().await;
            match source.fetch(scope, &name, credential).await {
                Ok(payload) => {
                    document
                        .tools
                        .entry(tool.clone())
                        .or_default()
                        .insert(name, payload);
                }
                Err(error) => record(
                    report,
                    FetchTarget::Entity(EntityId::template(tool.clone(), name)),
                    error,
                ),
            }
        }
    }
}

fn record(report: &mut CatalogReport, target: FetchTarget, error: ApiError) {
    tracing::warn!("Failed to read {}: {}", target, error);
    report.failures.push(CatalogFailure { target, error });
}
