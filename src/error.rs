//! Compiler error types.
//!
//! Every failure is fail-fast: a compile call yields one clear error or one
//! valid document, never best-effort output.

use thiserror::Error;

use crate::content_model::ContentContext;

#[derive(Debug, Error)]
pub enum CompileError {
    /// Structural mismatch against the item, interaction or widget schema.
    #[error("Schema violation at {path}: {message}")]
    SchemaViolation { path: String, message: String },

    /// A fragment breaks the grammar of the context it is placed in.
    #[error("Content model violation ({context}) in {path}: {rule}: `{snippet}`")]
    ContentModelViolation {
        context: ContentContext,
        path: String,
        rule: &'static str,
        snippet: String,
    },

    #[error("Slot resolution failed: {0}")]
    SlotResolution(#[from] SlotError),

    /// Unknown discriminant at a dispatch site.
    #[error("Unsupported {category} variant: {name}")]
    UnsupportedVariant { category: &'static str, name: String },

    #[error("Widget in slot '{slot}' failed to render: {message}")]
    WidgetRender { slot: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompileError {
    pub(crate) fn schema(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("slot '{0}' is not defined")]
    Missing(String),

    #[error("cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("slot '{name}' exceeds maximum nesting depth {max}")]
    DepthExceeded { name: String, max: usize },

    #[error("unresolved slots remain: {}", .0.join(", "))]
    Unresolved(Vec<String>),
}

/// Result type for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
