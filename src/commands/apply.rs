use chartsync_core::{CancelFlag, SyncReport};
use clap::Args;
use std::path::PathBuf;

use super::{load_backups, CommandError, SelectionArgs};
use crate::config::Config;
use crate::platforms;
use crate::progress_bar::BarObserver;

/// Replay backup files against the destination platform
#[derive(Debug, Args)]
pub struct ApplyCommand {
    /// Backup files, merged in order (default: backup_path from config)
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl ApplyCommand {
    pub async fn run(&self, config: &Config, cancel: &CancelFlag) -> Result<(), CommandError> {
        let files = if self.files.is_empty() {
            vec![config.backup_path.value.clone()]
        } else {
            self.files.clone()
        };
        let mut session = load_backups(config, &files)?;
        self.selection.apply_to(session.selection_mut());

        let destination = platforms::destination(config)?;
        let locator = platforms::locator(config)?;

        let observer = BarObserver::new();
        let result = session
            .apply(destination.as_ref(), &locator, &observer, cancel)
            .await;
        observer.finish();
        let report = result?;

        print_report(&report, &config.destination.platform.to_string());

        if report.failed.is_empty() {
            Ok(())
        } else {
            Err(CommandError::Incomplete {
                failed: report.failed.len(),
            })
        }
    }
}

fn print_report(report: &SyncReport, destination: &str) {
    for id in &report.succeeded {
        println!("  ✓ {}", id);
    }
    for failure in &report.failed {
        println!("  ✗ {} - {}", failure.entity, failure.error);
    }
    for id in &report.skipped {
        println!("  - {} (not supported by {})", id, destination);
    }

    println!();
    println!(
        "Applied {} of {} item(s) to {}",
        report.succeeded.len(),
        report.attempted(),
        destination
    );
    if report.cancelled {
        println!("Apply cancelled before all items were written.");
    }
}
