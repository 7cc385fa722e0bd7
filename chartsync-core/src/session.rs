//! The surface a front end drives: one current document, its selection,
//! and the fetch, import, export and apply operations over them.

use thiserror::Error;

use crate::api::{DestinationApi, SourceApi};
use crate::catalog::{CatalogBuilder, CatalogError, CatalogReport};
use crate::discovery::CredentialSource;
use crate::models::{BackupDocument, EntityId, ToolKind};
use crate::pipeline::{SyncError, SyncPipeline, SyncReport};
use crate::portable::{self, ExportError, ImportFormatError, MergeSummary};
use crate::progress::{CancelFlag, Observer};
use crate::selection::SelectionModel;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No backup loaded")]
    NoDocument,

    #[error(transparent)]
    Import(#[from] ImportFormatError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Selection refers to {0}, which is not in the current backup")]
    StaleSelection(EntityId),
}

/// Owns the current document and selection between operations.
///
/// Loading, importing or fetching a document resets the selection to
/// everything in it.
#[derive(Debug, Default)]
pub struct Session {
    document: Option<BackupDocument>,
    selection: SelectionModel,
    catalog: CatalogBuilder,
    pipeline: SyncPipeline,
}

impl Session {
    pub fn new(catalog: CatalogBuilder, pipeline: SyncPipeline) -> Self {
        Self {
            document: None,
            selection: SelectionModel::default(),
            catalog,
            pipeline,
        }
    }

    pub fn document(&self) -> Option<&BackupDocument> {
        self.document.as_ref()
    }

    /// Replaces the current document.
    pub fn load(&mut self, document: BackupDocument) {
        self.selection = SelectionModel::from_document(&document);
        self.document = Some(document);
    }

    /// Parses a backup file and overlays it onto the current document,
    /// starting a new one if none is loaded. A file that fails to parse
    /// leaves the session untouched.
    pub fn import(&mut self, text: &str) -> Result<MergeSummary, SessionError> {
        let parsed = portable::deserialize(text)?;
        let document = self.document.get_or_insert_with(BackupDocument::new);
        let summary = document.merge(parsed);
        self.selection = SelectionModel::from_document(document);
        tracing::debug!(
            "Imported backup: {} theme(s), {} template(s)",
            summary.themes,
            summary.templates
        );
        Ok(summary)
    }

    /// Serializes the selected part of the current document.
    pub fn export(&self) -> Result<String, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        Ok(portable::serialize(document, &self.selection)?)
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionModel {
        &mut self.selection
    }

    /// Installs a selection built elsewhere. Every entity it names must be
    /// in the current document.
    pub fn set_selection(&mut self, selection: SelectionModel) -> Result<(), SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        if let Some(stale) = selection.entities().find(|id| !document.contains(id)) {
            return Err(SessionError::StaleSelection(stale.clone()));
        }
        self.selection = selection;
        Ok(())
    }

    /// Reads a fresh document from `source` and makes it current.
    ///
    /// The previous document is replaced even when some reads failed; the
    /// report says which.
    pub async fn build_catalog(
        &mut self,
        source: &dyn SourceApi,
        credentials: &dyn CredentialSource,
        tools: &[ToolKind],
        include_themes: bool,
        observer: &dyn Observer,
        cancel: &CancelFlag,
    ) -> Result<CatalogReport, SessionError> {
        let outcome = self
            .catalog
            .build_catalog(source, credentials, tools, include_themes, observer, cancel)
            .await?;
        self.load(outcome.document);
        Ok(outcome.report)
    }

    /// Replays the selected entities against `destination`.
    pub async fn apply(
        &self,
        destination: &dyn DestinationApi,
        credentials: &dyn CredentialSource,
        observer: &dyn Observer,
        cancel: &CancelFlag,
    ) -> Result<SyncReport, SessionError> {
        let document = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        Ok(self
            .pipeline
            .apply(
                document,
                &self.selection,
                destination,
                credentials,
                observer,
                cancel,
            )
            .await?)
    }
}
