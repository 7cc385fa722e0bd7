//! Portable backup file format.
//!
//! A backup file is a UTF-8 JSON object:
//!
//! ```text
//! {
//!   "_":      { ...advisory meta... },            // optional, also accepted as "meta"
//!   "THEMES": { "<theme>": <opaque json> },        // optional
//!   "TOOLS":  { "<tool id>": { "<template>": <opaque json> } }   // optional
//! }
//! ```
//!
//! At least one of `THEMES` / `TOOLS` must be present. Importing overlays
//! each category present in the file onto the current document and leaves
//! the others alone.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{BackupDocument, Category, DocumentMeta, Payload, Scope, ToolId, Templates};
use crate::selection::SelectionModel;

const META_KEY: &str = "_";
const META_ALIAS: &str = "meta";

/// A backup file failed to parse or lacked the expected shape.
#[derive(Error, Debug)]
pub enum ImportFormatError {
    #[error("Backup file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backup file must contain a JSON object at the top level")]
    NotAnObject,

    #[error("Backup file contains neither THEMES nor TOOLS")]
    NoCategories,

    #[error("Backup file has a malformed {category} section: {reason}")]
    BadCategory {
        category: &'static str,
        reason: String,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExportError {
    #[error("Nothing to export: no entities are selected")]
    NothingToExport,
}

/// Parsed contents of a backup file, before merging.
///
/// `None` means the category was absent from the file; `Some` of an empty
/// map means the file carried the category with no entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortableDocument {
    pub themes: Option<BTreeMap<String, Payload>>,
    pub tools: Option<BTreeMap<ToolId, Templates>>,
    pub meta: Option<DocumentMeta>,
}

/// What a merge replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub themes_replaced: bool,
    pub tools_replaced: bool,
    pub themes: usize,
    pub templates: usize,
}

/// Parses a backup file.
pub fn deserialize(text: &str) -> Result<PortableDocument, ImportFormatError> {
    let root: Value = serde_json::from_str(text)?;
    let Value::Object(mut root) = root else {
        return Err(ImportFormatError::NotAnObject);
    };

    let themes = match root.remove(Category::Themes.key()) {
        None => None,
        Some(value) => Some(parse_themes(value)?),
    };
    let tools = match root.remove(Category::Tools.key()) {
        None => None,
        Some(value) => Some(parse_tools(value)?),
    };
    if themes.is_none() && tools.is_none() {
        return Err(ImportFormatError::NoCategories);
    }

    // Meta is advisory; anything unreadable is dropped rather than rejected.
    let meta = root
        .remove(META_KEY)
        .or_else(|| root.remove(META_ALIAS))
        .and_then(|value| serde_json::from_value::<DocumentMeta>(value).ok());

    Ok(PortableDocument {
        themes,
        tools,
        meta,
    })
}

fn parse_themes(value: Value) -> Result<BTreeMap<String, Payload>, ImportFormatError> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(bad_category(Category::Themes, &other, "an object of themes")),
    }
}

fn parse_tools(value: Value) -> Result<BTreeMap<ToolId, Templates>, ImportFormatError> {
    let map = match value {
        Value::Object(map) => map,
        other => return Err(bad_category(Category::Tools, &other, "an object of tools")),
    };

    let mut tools = BTreeMap::new();
    for (tool, templates) in map {
        match templates {
            // An empty bucket carries nothing to select or apply.
            Value::Object(templates) if templates.is_empty() => {}
            Value::Object(templates) => {
                tools.insert(ToolId::new(tool), templates.into_iter().collect());
            }
            other => {
                return Err(ImportFormatError::BadCategory {
                    category: Category::Tools.key(),
                    reason: format!(
                        "'{}' should map template names to content, found {}",
                        tool,
                        json_kind(&other)
                    ),
                })
            }
        }
    }
    Ok(tools)
}

fn bad_category(category: Category, found: &Value, expected: &str) -> ImportFormatError {
    ImportFormatError::BadCategory {
        category: category.key(),
        reason: format!("expected {}, found {}", expected, json_kind(found)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Writes the selected entities of `document` as a pretty-printed backup file.
///
/// Categories with nothing selected are left out of the file, so importing
/// the result never clears a category the user did not export.
pub fn serialize(
    document: &BackupDocument,
    selection: &SelectionModel,
) -> Result<String, ExportError> {
    let mut themes = Map::new();
    let mut tools: BTreeMap<&ToolId, Map<String, Value>> = BTreeMap::new();

    for id in selection.selected_entities() {
        let Some(payload) = document.payload(&id) else {
            continue;
        };
        match &id.scope {
            Scope::Themes => {
                themes.insert(id.name.clone(), payload.clone());
            }
            Scope::Tool(tool) => {
                // Borrow the key from the document so the map outlives `id`.
                if let Some((tool, _)) = document.tools.get_key_value(tool) {
                    tools
                        .entry(tool)
                        .or_default()
                        .insert(id.name.clone(), payload.clone());
                }
            }
        }
    }

    if themes.is_empty() && tools.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let mut root = Map::new();
    if let Some(meta) = &document.meta {
        if let Ok(meta) = serde_json::to_value(meta) {
            root.insert(META_KEY.to_string(), meta);
        }
    }
    if !themes.is_empty() {
        root.insert(Category::Themes.key().to_string(), Value::Object(themes));
    }
    if !tools.is_empty() {
        let tools: Map<String, Value> = tools
            .into_iter()
            .map(|(tool, templates)| (tool.to_string(), Value::Object(templates)))
            .collect();
        root.insert(Category::Tools.key().to_string(), Value::Object(tools));
    }

    // A map of JSON values always serializes.
    Ok(serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default())
}

impl BackupDocument {
    /// Builds a fresh document from a parsed backup file.
    pub fn from_portable(portable: PortableDocument) -> Self {
        let mut document = Self::new();
        document.merge(portable);
        document
    }

    /// Overlays each category present in `portable` onto this document.
    pub fn merge(&mut self, portable: PortableDocument) -> MergeSummary {
        let themes_replaced = portable.themes.is_some();
        let tools_replaced = portable.tools.is_some();

        if let Some(themes) = portable.themes {
            self.themes = themes;
        }
        if let Some(tools) = portable.tools {
            self.tools = tools;
        }
        if portable.meta.is_some() {
            self.meta = portable.meta;
        }

        MergeSummary {
            themes_replaced,
            tools_replaced,
            themes: self.themes.len(),
            templates: self.template_count(),
        }
    }
}
