//! Replays the selected part of a backup against a destination platform.
//!
//! A run moves through [`PipelineState`]: it resolves a credential when the
//! destination needs one, then writes one entity at a time (themes first,
//! then templates grouped by tool) and finishes in `Done`. A failed write is
//! recorded in the [`SyncReport`] and the run carries on; only the
//! preconditions in [`SyncError`] stop it before the first write.

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::api::{ApiError, DestinationApi};
use crate::discovery::{CredentialSource, DiscoveryError};
use crate::models::{BackupDocument, EntityId, Payload, Scope};
use crate::pacing::Pacer;
use crate::progress::{CancelFlag, Observer, Progress};
use crate::selection::SelectionModel;

pub const DEFAULT_WRITE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AuthResolving,
    /// Writing the entity at this zero-based position of the plan
    Writing(usize),
    Done,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Nothing selected to apply")]
    NothingSelected,

    #[error("Cannot write to destination: {0}")]
    Auth(#[from] DiscoveryError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub entity: EntityId,
    pub error: ApiError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub succeeded: Vec<EntityId>,
    pub failed: Vec<SyncFailure>,
    /// Selected entities the destination cannot store, or has no room for
    /// in this run
    pub skipped: Vec<EntityId>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Sequential writer with a pause between writes.
#[derive(Debug, Clone)]
pub struct SyncPipeline {
    delay: Duration,
}

impl Default for SyncPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_DELAY)
    }
}

impl SyncPipeline {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub async fn apply(
        &self,
        document: &BackupDocument,
        selection: &SelectionModel,
        destination: &dyn DestinationApi,
        credentials: &dyn CredentialSource,
        observer: &dyn Observer,
        cancel: &CancelFlag,
    ) -> Result<SyncReport, SyncError> {
        observer.on_transition(&PipelineState::Idle);

        let mut report = SyncReport::default();
        let mut plan: Vec<(EntityId, &Payload)> = Vec::new();
        let mut planned: BTreeMap<Scope, usize> = BTreeMap::new();

        for id in selection.selected_entities() {
            let Some(payload) = document.payload(&id) else {
                continue;
            };
            let count = planned.entry(id.scope.clone()).or_default();
            let has_room = destination
                .max_per_run(&id.scope)
                .map_or(true, |max| *count < max);
            if destination.accepts(&id.scope) && has_room {
                *count += 1;
                plan.push((id, payload));
            } else {
                report.skipped.push(id);
            }
        }

        if plan.is_empty() && report.skipped.is_empty() {
            return Err(SyncError::NothingSelected);
        }

        if document.themes.is_empty() {
            observer.on_status("No themes in backup");
        }
        if !report.skipped.is_empty() {
            tracing::info!(
                "Skipping {} entities {} cannot store in this run",
                report.skipped.len(),
                destination.platform()
            );
            observer.on_status(&format!(
                "Skipping {} item(s) {} cannot store",
                report.skipped.len(),
                destination.platform()
            ));
        }

        let needs_credential = plan
            .iter()
            .any(|(id, _)| destination.requires_credential(&id.scope));
        let credential = if needs_credential {
            observer.on_transition(&PipelineState::AuthResolving);
            observer.on_status("Looking for access token");
            Some(credentials.credential().await?)
        } else {
            None
        };

        let total = plan.len();
        let mut pacer = Pacer::new(self.delay);

        for (index, (id, payload)) in plan.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            observer.on_transition(&PipelineState::Writing(index));
            observer.on_status(&describe(&id));
            pacer.pace().await;

            match destination
                .write(&id.scope, &id.name, payload, credential.as_ref())
                .await
            {
                Ok(()) => {
                    tracing::debug!("Wrote {}", id);
                    report.succeeded.push(id);
                }
                Err(error) => {
                    tracing::warn!("Failed to write {}: {}", id, error);
                    report.failed.push(SyncFailure { entity: id, error });
                }
            }
            observer.on_progress(Progress::of(index + 1, total));
        }

        if total == 0 {
            observer.on_progress(Progress::of(0, 0));
        }
        observer.on_transition(&PipelineState::Done);

        tracing::info!(
            "Apply finished: {} written, {} failed, {} skipped{}",
            report.succeeded.len(),
            report.failed.len(),
            report.skipped.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );

        Ok(report)
    }
}

fn describe(id: &EntityId) -> String {
    match &id.scope {
        Scope::Themes => format!("Applying theme {}", id.name),
        Scope::Tool(tool) => format!("Applying {} template {}", tool, id.name),
    }
}
