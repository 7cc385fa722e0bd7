mod document;
mod tool_kind;

pub use document::{BackupDocument, Category, DocumentMeta, EntityId, Payload, Scope, Templates};
pub use tool_kind::{ToolId, ToolKind};
