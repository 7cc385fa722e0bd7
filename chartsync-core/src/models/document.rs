use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::tool_kind::ToolId;

/// Opaque theme or template content, owned by the platform.
pub type Payload = Value;

/// Top-level grouping of entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Themes,
    Tools,
}

impl Category {
    /// Key used for the category in the portable document.
    pub fn key(&self) -> &'static str {
        match self {
            Category::Themes => "THEMES",
            Category::Tools => "TOOLS",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Where an entity lives: the theme list, or the template list of one tool.
///
/// Ordering puts themes before every tool, which is the order entities are
/// enumerated and replayed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Themes,
    Tool(ToolId),
}

impl Scope {
    pub fn category(&self) -> Category {
        match self {
            Scope::Themes => Category::Themes,
            Scope::Tool(_) => Category::Tools,
        }
    }

    pub fn tool(&self) -> Option<&ToolId> {
        match self {
            Scope::Themes => None,
            Scope::Tool(tool) => Some(tool),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Themes => f.write_str(Category::Themes.key()),
            Scope::Tool(tool) => write!(f, "{}", tool),
        }
    }
}

/// Identity of a single theme or template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId {
    pub scope: Scope,
    pub name: String,
}

impl EntityId {
    pub fn theme(name: impl Into<String>) -> Self {
        Self {
            scope: Scope::Themes,
            name: name.into(),
        }
    }

    pub fn template(tool: impl Into<ToolId>, name: impl Into<String>) -> Self {
        Self {
            scope: Scope::Tool(tool.into()),
            name: name.into(),
        }
    }

    /// Parses the `SCOPE/NAME` form produced by `Display`.
    ///
    /// Only the first `/` separates scope from name, so template names may
    /// contain slashes.
    pub fn parse(s: &str) -> Option<Self> {
        let (scope, name) = s.split_once('/')?;
        if scope.is_empty() || name.is_empty() {
            return None;
        }
        if scope.eq_ignore_ascii_case(Category::Themes.key()) {
            Some(Self::theme(name))
        } else {
            Some(Self::template(ToolId::new(scope), name))
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

/// Advisory information about where a backup came from. Never validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Anything else an imported file carried
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DocumentMeta {
    pub fn generated_now(source: impl Into<String>, user: Option<String>) -> Self {
        Self {
            user,
            source: Some(source.into()),
            generated_at: Some(Utc::now()),
            extra: BTreeMap::new(),
        }
    }
}

pub type Templates = BTreeMap<String, Payload>;

/// Themes and drawing-tool templates held in memory between fetch, import,
/// export and apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupDocument {
    pub themes: BTreeMap<String, Payload>,
    pub tools: BTreeMap<ToolId, Templates>,
    pub meta: Option<DocumentMeta>,
}

impl BackupDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(mut self, name: impl Into<String>, payload: Payload) -> Self {
        self.themes.insert(name.into(), payload);
        self
    }

    pub fn with_template(
        mut self,
        tool: impl Into<ToolId>,
        name: impl Into<String>,
        payload: Payload,
    ) -> Self {
        self.tools
            .entry(tool.into())
            .or_default()
            .insert(name.into(), payload);
        self
    }

    /// Returns true if the document carries no migratable entities.
    pub fn is_empty(&self) -> bool {
        self.themes.is_empty() && self.tools.values().all(|t| t.is_empty())
    }

    pub fn entity_count(&self) -> usize {
        self.themes.len() + self.tools.values().map(|t| t.len()).sum::<usize>()
    }

    pub fn template_count(&self) -> usize {
        self.tools.values().map(|t| t.len()).sum()
    }

    /// Every entity in enumeration order: themes first, then templates by tool.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        let themes = self.themes.keys().map(|name| EntityId::theme(name.clone()));
        let templates = self.tools.iter().flat_map(|(tool, templates)| {
            templates
                .keys()
                .map(move |name| EntityId::template(tool.clone(), name.clone()))
        });
        themes.chain(templates)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.payload(id).is_some()
    }

    pub fn payload(&self, id: &EntityId) -> Option<&Payload> {
        match &id.scope {
            Scope::Themes => self.themes.get(&id.name),
            Scope::Tool(tool) => self.tools.get(tool).and_then(|t| t.get(&id.name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolKind;
    use serde_json::json;

    fn sample() -> BackupDocument {
        BackupDocument::new()
            .with_theme("dark", json!({"chartProperties": {"a": 1}}))
            .with_template(ToolKind::Rectangle, "t1", json!({"x": 1}))
            .with_template(ToolKind::Circle, "c1", json!({"r": 2}))
    }

    #[test]
    fn test_empty_document() {
        let doc = BackupDocument::new();
        assert!(doc.is_empty());
        assert_eq!(doc.entity_count(), 0);
        assert_eq!(doc.entities().count(), 0);
    }

    #[test]
    fn test_entities_themes_first() {
        let ids: Vec<String> = sample().entities().map(|id| id.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "THEMES/dark",
                "LineToolCircle/c1",
                "LineToolRectangle/t1"
            ]
        );
    }

    #[test]
    fn test_payload_lookup() {
        let doc = sample();
        assert_eq!(
            doc.payload(&EntityId::template(ToolKind::Rectangle, "t1")),
            Some(&json!({"x": 1}))
        );
        assert!(!doc.contains(&EntityId::theme("light")));
        assert!(!doc.contains(&EntityId::template(ToolKind::Ray, "t1")));
    }

    #[test]
    fn test_entity_id_parse() {
        assert_eq!(EntityId::parse("THEMES/dark"), Some(EntityId::theme("dark")));
        assert_eq!(EntityId::parse("themes/dark"), Some(EntityId::theme("dark")));
        assert_eq!(
            EntityId::parse("LineToolRectangle/a/b"),
            Some(EntityId::template(ToolKind::Rectangle, "a/b"))
        );
        assert_eq!(EntityId::parse("no-separator"), None);
        assert_eq!(EntityId::parse("/name"), None);
    }

    #[test]
    fn test_empty_tool_bucket_is_empty_document() {
        let mut doc = BackupDocument::new();
        doc.tools.insert(ToolKind::Ray.into(), Templates::new());
        assert!(doc.is_empty());
    }
}
