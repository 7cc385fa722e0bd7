//! Which entities of the current document take part in an export or apply.

use std::collections::BTreeMap;

use crate::models::{BackupDocument, EntityId, Scope, ToolKind};

/// UI grouping of entities. Tool identifiers outside the known catalog all
/// land in [`Group::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Group {
    Themes,
    Tool(ToolKind),
    Other,
}

impl Group {
    pub fn of(scope: &Scope) -> Self {
        match scope {
            Scope::Themes => Group::Themes,
            Scope::Tool(tool) => tool.kind().map(Group::Tool).unwrap_or(Group::Other),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Group::Themes => "Themes",
            Group::Tool(kind) => kind.label(),
            Group::Other => "Other tools",
        }
    }
}

/// Included/excluded flag for every entity of one document.
///
/// Only entities present in the document the model was built from can be
/// selected; the model is rebuilt whenever a new document is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionModel {
    entries: BTreeMap<EntityId, bool>,
}

impl SelectionModel {
    /// Every entity of `document`, selected.
    pub fn from_document(document: &BackupDocument) -> Self {
        Self {
            entries: document.entities().map(|id| (id, true)).collect(),
        }
    }

    pub fn select_all(&mut self) {
        self.entries.values_mut().for_each(|flag| *flag = true);
    }

    pub fn deselect_all(&mut self) {
        self.entries.values_mut().for_each(|flag| *flag = false);
    }

    /// Sets one entity's flag. Returns false if the entity is not selectable.
    pub fn set(&mut self, id: &EntityId, selected: bool) -> bool {
        match self.entries.get_mut(id) {
            Some(flag) => {
                *flag = selected;
                true
            }
            None => false,
        }
    }

    /// Sets the flag of every entity in `scope` and returns how many there were.
    pub fn set_scope(&mut self, scope: &Scope, selected: bool) -> usize {
        let mut touched = 0;
        for (id, flag) in self.entries.iter_mut() {
            if &id.scope == scope {
                *flag = selected;
                touched += 1;
            }
        }
        touched
    }

    /// Keeps only the entities matching `keep` selected.
    pub fn retain(&mut self, mut keep: impl FnMut(&EntityId) -> bool) {
        for (id, flag) in self.entries.iter_mut() {
            if *flag && !keep(id) {
                *flag = false;
            }
        }
    }

    pub fn is_selected(&self, id: &EntityId) -> bool {
        self.entries.get(id).copied().unwrap_or(false)
    }

    pub fn is_selectable(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    /// Selected entities in enumeration order: themes, then templates by tool.
    pub fn selected_entities(&self) -> Vec<EntityId> {
        self.entries
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Every selectable entity, selected or not.
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    pub fn selected_count(&self) -> usize {
        self.entries.values().filter(|selected| **selected).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities with their flags, bucketed the way a checkbox list shows them.
    pub fn groups(&self) -> Vec<(Group, Vec<(&EntityId, bool)>)> {
        let mut groups: BTreeMap<Group, Vec<(&EntityId, bool)>> = BTreeMap::new();
        for (id, selected) in &self.entries {
            groups
                .entry(Group::of(&id.scope))
                .or_default()
                .push((id, *selected));
        }
        groups.into_iter().collect()
    }
}
