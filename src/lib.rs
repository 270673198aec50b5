//! QTI Compiler - Assessment Item Compiler
//!
//! Turns a declarative assessment item (prompt, interactions, correct answers,
//! feedback) into a QTI 3.0 XML document.
//!
//! # The Rules (Non-Negotiable)
//! 1. Every fragment is validated against its content context before use
//! 2. Every slot resolves, or compilation fails
//! 3. One canonical answer expands to its full equivalence class
//! 4. Deterministic Output
//! 5. One call, one clear error or one valid document

pub mod config;
pub mod content_model;
pub mod equivalence;
pub mod error;
pub mod hashing;
pub mod interactions;
pub mod pipeline;
pub mod render;
pub mod responses;
pub mod schema;
pub mod slots;
pub mod widgets;
pub mod xml;

pub use config::CompilerConfig;
pub use content_model::{ContentContext, ContentModelValidator, ContentRule};
pub use equivalence::expand;
pub use error::{CompileError, CompileResult, SlotError};
pub use hashing::{canonical_json, compute_item_hash, sha256_hex};
pub use pipeline::{CompiledItem, ItemCompiler};
pub use schema::{
    AssessmentItem, BaseType, Cardinality, Content, ContentNode, CorrectValue, Interaction,
    ResponseDeclaration,
};
pub use slots::{SlotMap, SlotResolver, MAX_SLOT_DEPTH};
pub use widgets::{PlaceholderRenderer, Widget, WidgetRegistry, WidgetRenderer, WidgetSpec};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
