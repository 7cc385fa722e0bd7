mod apply;
mod config_cmd;
mod export;
mod fetch;
mod list;
mod token;

pub use apply::ApplyCommand;
pub use config_cmd::ConfigCommand;
pub use export::ExportCommand;
pub use fetch::FetchCommand;
pub use list::ListCommand;
pub use token::TokenCommand;

use chartsync_core::{
    CatalogBuilder, DiscoveryError, EntityId, Scope, SelectionModel, Session, SessionError,
    SyncPipeline, ToolKind,
};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::platforms::SetupError;

/// Narrows the selection of a loaded backup
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Only templates of this tool kind (repeatable), e.g. rectangle or LineToolRectangle
    #[arg(long = "tool", value_name = "KIND")]
    pub tools: Vec<ToolKind>,

    /// Only this theme (repeatable)
    #[arg(long = "theme", value_name = "NAME")]
    pub themes: Vec<String>,

    /// Leave out one entity, written SCOPE/NAME (e.g. THEMES/dark)
    #[arg(long, value_name = "SCOPE/NAME", value_parser = parse_entity)]
    pub exclude: Vec<EntityId>,

    /// Leave out all themes
    #[arg(long)]
    pub no_themes: bool,

    /// Leave out all drawing templates
    #[arg(long)]
    pub no_templates: bool,
}

fn parse_entity(s: &str) -> Result<EntityId, String> {
    EntityId::parse(s).ok_or_else(|| format!("Expected SCOPE/NAME, got '{}'", s))
}

impl SelectionArgs {
    pub fn apply_to(&self, selection: &mut SelectionModel) {
        selection.retain(|id| match &id.scope {
            Scope::Themes => {
                !self.no_themes && (self.themes.is_empty() || self.themes.contains(&id.name))
            }
            Scope::Tool(tool) => {
                !self.no_templates
                    && (self.tools.is_empty()
                        || tool.kind().is_some_and(|kind| self.tools.contains(&kind)))
            }
        });
        for id in &self.exclude {
            if !selection.set(id, false) {
                tracing::warn!("--exclude {}: not in the loaded backup", id);
            }
        }
    }
}

/// Builds a session paced the way the config asks.
pub fn new_session(config: &Config) -> Session {
    Session::new(
        CatalogBuilder::new(config.pacing.fetch_delay()),
        SyncPipeline::new(config.pacing.write_delay()),
    )
}

/// Merges backup files into a fresh session, in order.
pub fn load_backups(config: &Config, files: &[PathBuf]) -> Result<Session, CommandError> {
    let mut session = new_session(config);
    for path in files {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CommandError::Read(path.clone(), e))?;
        let summary = session
            .import(&text)
            .map_err(|e| CommandError::Import(path.clone(), e))?;
        tracing::info!(
            "Loaded {}: {} theme(s), {} template(s) in total",
            path.display(),
            summary.themes,
            summary.templates
        );
    }
    Ok(session)
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), CommandError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CommandError::Write(parent.into(), e))?;
    }
    std::fs::write(path, contents).map_err(|e| CommandError::Write(path.into(), e))
}

/// Errors from chartsync commands
#[derive(Debug)]
pub enum CommandError {
    Setup(SetupError),
    Session(SessionError),
    Discovery(DiscoveryError),
    Read(PathBuf, std::io::Error),
    Write(PathBuf, std::io::Error),
    Import(PathBuf, SessionError),
    Incomplete { failed: usize },
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Setup(e) => write!(f, "{}", e),
            CommandError::Session(e) => write!(f, "{}", e),
            CommandError::Discovery(e) => write!(f, "{}", e),
            CommandError::Read(path, e) => {
                write!(f, "Failed to read '{}': {}", path.display(), e)
            }
            CommandError::Write(path, e) => {
                write!(f, "Failed to write '{}': {}", path.display(), e)
            }
            CommandError::Import(path, e) => write!(f, "{}: {}", path.display(), e),
            CommandError::Incomplete { failed } => {
                write!(f, "{} item(s) could not be applied", failed)
            }
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Setup(e) => Some(e),
            CommandError::Session(e) | CommandError::Import(_, e) => Some(e),
            CommandError::Discovery(e) => Some(e),
            CommandError::Read(_, e) | CommandError::Write(_, e) => Some(e),
            CommandError::Incomplete { .. } => None,
        }
    }
}

impl From<SetupError> for CommandError {
    fn from(e: SetupError) -> Self {
        CommandError::Setup(e)
    }
}

impl From<SessionError> for CommandError {
    fn from(e: SessionError) -> Self {
        CommandError::Session(e)
    }
}

impl From<DiscoveryError> for CommandError {
    fn from(e: DiscoveryError) -> Self {
        CommandError::Discovery(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsync_core::BackupDocument;
    use serde_json::json;

    fn selection() -> SelectionModel {
        let document = BackupDocument::new()
            .with_theme("dark", json!({}))
            .with_theme("light", json!({}))
            .with_template(ToolKind::Rectangle, "r1", json!({}))
            .with_template(ToolKind::Text, "t1", json!({}))
            .with_template(chartsync_core::ToolId::new("LineToolMystery"), "m", json!({}));
        SelectionModel::from_document(&document)
    }

    #[test]
    fn test_default_args_keep_everything() {
        let mut selection = selection();
        SelectionArgs::default().apply_to(&mut selection);
        assert_eq!(selection.selected_count(), 5);
    }

    #[test]
    fn test_tool_filter_drops_unknown_kinds() {
        let mut selection = selection();
        let args = SelectionArgs {
            tools: vec![ToolKind::Rectangle],
            ..Default::default()
        };
        args.apply_to(&mut selection);

        assert!(selection.is_selected(&EntityId::template(ToolKind::Rectangle, "r1")));
        assert!(!selection.is_selected(&EntityId::template(ToolKind::Text, "t1")));
        assert!(!selection.is_selected(&EntityId::template(
            chartsync_core::ToolId::new("LineToolMystery"),
            "m"
        )));
        assert!(selection.is_selected(&EntityId::theme("dark")));
    }

    #[test]
    fn test_theme_and_exclude_flags() {
        let mut selection = selection();
        let args = SelectionArgs {
            themes: vec!["dark".to_string()],
            exclude: vec![EntityId::parse("LineToolText/t1").unwrap()],
            no_templates: false,
            ..Default::default()
        };
        args.apply_to(&mut selection);

        assert_eq!(
            selection.selected_entities(),
            vec![
                EntityId::theme("dark"),
                EntityId::template(chartsync_core::ToolId::new("LineToolMystery"), "m"),
                EntityId::template(ToolKind::Rectangle, "r1"),
            ]
        );
    }

    #[test]
    fn test_no_themes_no_templates() {
        let mut selection = selection();
        let args = SelectionArgs {
            no_themes: true,
            no_templates: true,
            ..Default::default()
        };
        args.apply_to(&mut selection);
        assert_eq!(selection.selected_count(), 0);
    }

    #[test]
    fn test_load_backups_merges_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        std::fs::write(
            &first,
            r#"{"THEMES": {"dark": {}}, "TOOLS": {"LineToolRectangle": {"r": {}}}}"#,
        )
        .unwrap();
        std::fs::write(&second, r#"{"THEMES": {"light": {}}}"#).unwrap();
        let config = Config::load(Some(dir.path().join("none.yaml"))).unwrap();

        let session = load_backups(&config, &[first, second]).unwrap();
        let document = session.document().unwrap();
        assert_eq!(document.themes.keys().collect::<Vec<_>>(), vec!["light"]);
        assert_eq!(document.template_count(), 1);
    }

    #[test]
    fn test_load_backups_reports_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{}").unwrap();
        let config = Config::load(Some(dir.path().join("none.yaml"))).unwrap();

        let err = load_backups(&config, &[bad]).unwrap_err();
        assert!(err.to_string().contains("neither THEMES nor TOOLS"));
    }
}
