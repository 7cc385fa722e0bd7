use chartsync_core::Session;
use chrono::Local;
use clap::Args;
use std::path::PathBuf;

use super::{load_backups, CommandError};
use crate::config::Config;

/// Show what one or more backup files contain
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Backup files, merged in order (default: backup_path from config)
    pub files: Vec<PathBuf>,
}

impl ListCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let files = if self.files.is_empty() {
            vec![config.backup_path.value.clone()]
        } else {
            self.files.clone()
        };
        let session = load_backups(config, &files)?;
        print_session(&session);
        Ok(())
    }
}

fn print_session(session: &Session) {
    let Some(document) = session.document() else {
        return;
    };

    if let Some(meta) = &document.meta {
        let source = meta.source.as_deref().unwrap_or("unknown source");
        match meta.generated_at {
            Some(at) => println!(
                "Backup from {} ({})",
                source,
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            ),
            None => println!("Backup from {}", source),
        }
        println!();
    }

    for (group, entities) in session.selection().groups() {
        println!("{} ({})", group.label(), entities.len());
        for (id, _) in entities {
            if group == chartsync_core::Group::Other {
                println!("  {} [{}]", id.name, id.scope);
            } else {
                println!("  {}", id.name);
            }
        }
    }

    println!();
    println!(
        "{} theme(s), {} template(s)",
        document.themes.len(),
        document.template_count()
    );
}
