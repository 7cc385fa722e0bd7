use clap::Args;
use std::path::PathBuf;

use super::{load_backups, write_file, CommandError, SelectionArgs};
use crate::config::Config;

/// Write a subset of one or more backup files to a new file
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Backup files, merged in order
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// File to write
    #[arg(long, short)]
    pub output: PathBuf,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl ExportCommand {
    pub fn run(&self, config: &Config) -> Result<(), CommandError> {
        let mut session = load_backups(config, &self.files)?;
        self.selection.apply_to(session.selection_mut());

        let count = session.selection().selected_count();
        let text = session.export()?;
        write_file(&self.output, &text)?;

        println!("Exported {} item(s) to {}", count, self.output.display());
        Ok(())
    }
}
