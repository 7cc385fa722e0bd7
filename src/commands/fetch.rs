use chartsync_core::{CancelFlag, Session, ToolKind};
use clap::Args;
use std::path::{Path, PathBuf};

use super::{new_session, write_file, CommandError};
use crate::config::Config;
use crate::platforms;
use crate::progress_bar::BarObserver;

/// Download themes and drawing templates from the source platform into a backup file
#[derive(Debug, Args)]
pub struct FetchCommand {
    /// Only fetch templates of this tool kind (repeatable; default: all kinds)
    #[arg(long = "tool", value_name = "KIND")]
    pub tools: Vec<ToolKind>,

    /// Do not fetch themes
    #[arg(long)]
    pub no_themes: bool,

    /// Where to write the backup (default: backup_path from config)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl FetchCommand {
    pub async fn run(&self, config: &Config, cancel: &CancelFlag) -> Result<(), CommandError> {
        let source = platforms::source(config)?;
        let locator = platforms::locator(config)?;
        let tools: &[ToolKind] = if self.tools.is_empty() {
            ToolKind::ALL
        } else {
            &self.tools
        };

        let mut session = new_session(config);
        let observer = BarObserver::new();
        let result = session
            .build_catalog(
                source.as_ref(),
                &locator,
                tools,
                !self.no_themes,
                &observer,
                cancel,
            )
            .await;
        observer.finish();
        let report = result?;

        for failure in &report.failures {
            println!("  ✗ {} - {}", failure.target, failure.error);
        }

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| config.backup_path.value.clone());
        match save(&session, &output)? {
            Some((themes, templates)) => {
                if report.cancelled {
                    println!("Fetch cancelled; kept what was read so far.");
                }
                println!(
                    "Saved {} theme(s) and {} template(s) to {}",
                    themes,
                    templates,
                    output.display()
                );
            }
            None if report.cancelled => println!("Fetch cancelled before anything was read."),
            None => println!("Nothing fetched; no backup written."),
        }
        Ok(())
    }
}

/// Writes the fetched document to `output` and returns its theme and
/// template counts, or `None` without touching the file when nothing was read.
fn save(session: &Session, output: &Path) -> Result<Option<(usize, usize)>, CommandError> {
    let Some(document) = session.document().filter(|d| !d.is_empty()) else {
        tracing::info!("Fetch read nothing; leaving {} alone", output.display());
        return Ok(None);
    };
    let text = session.export()?;
    write_file(output, &text)?;
    Ok(Some((document.themes.len(), document.template_count())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsync_core::BackupDocument;
    use serde_json::json;
    use tempfile::tempdir;

    fn session_with(document: BackupDocument) -> Session {
        let dir = tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("none.yaml"))).unwrap();
        let mut session = new_session(&config);
        session.load(document);
        session
    }

    #[test]
    fn test_empty_fetch_writes_no_file() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("backup.json");

        let saved = save(&session_with(BackupDocument::new()), &output).unwrap();

        assert_eq!(saved, None);
        assert!(!output.exists());
    }

    #[test]
    fn test_fetched_document_is_saved() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("out").join("backup.json");
        let document = BackupDocument::new()
            .with_theme("dark", json!({"chartProperties": {}}))
            .with_template(ToolKind::Rectangle, "r", json!({}));

        let saved = save(&session_with(document), &output).unwrap();

        assert_eq!(saved, Some((1, 1)));
        let text = std::fs::read_to_string(&output).unwrap();
        assert!(text.contains("LineToolRectangle"));
    }
}
