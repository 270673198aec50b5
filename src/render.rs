//! Content Rendering - node trees to markup
//!
//! Text is escaped, math is wrapped in a MathML element, slots are looked up
//! in the active slot map. Block slots are always wrapped in a `<div>`, even
//! when the slot content is already block-level.

use crate::error::{CompileError, CompileResult, SlotError};
use crate::schema::{Content, ContentNode};
use crate::slots::SlotMap;
use crate::xml::escape_text;

pub const MATHML_NS: &str = "http://www.w3.org/1998/Math/MathML";

pub struct ContentRenderer<'a> {
    slots: &'a SlotMap,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(slots: &'a SlotMap) -> Self {
        Self { slots }
    }

    /// Render block content. Markup passes through unchanged; placeholders in
    /// it are left for the slot resolver.
    pub fn render(&self, content: &Content, path: &str) -> CompileResult<String> {
        match content {
            Content::Markup(markup) => Ok(markup.clone()),
            Content::Nodes(nodes) => nodes
                .iter()
                .enumerate()
                .map(|(i, node)| self.render_block(node, &format!("{path}[{i}]")))
                .collect(),
        }
    }

    fn render_block(&self, node: &ContentNode, path: &str) -> CompileResult<String> {
        match node {
            ContentNode::Paragraph { content } => {
                let inner = content
                    .iter()
                    .enumerate()
                    .map(|(i, child)| self.render_inline(child, &format!("{path}.content[{i}]")))
                    .collect::<CompileResult<String>>()?;
                Ok(format!("<p>{inner}</p>"))
            }
            ContentNode::BlockSlot { slot } => Ok(format!("<div>{}</div>", self.lookup(slot)?)),
            ContentNode::Text { .. } | ContentNode::Math { .. } | ContentNode::InlineSlot { .. } => {
                Err(CompileError::schema(
                    path,
                    "inline node at block level; wrap it in a paragraph",
                ))
            }
        }
    }

    fn render_inline(&self, node: &ContentNode, path: &str) -> CompileResult<String> {
        match node {
            ContentNode::Text { content } => Ok(escape_text(content)),
            ContentNode::Math { mathml } => Ok(format!(r#"<math xmlns="{MATHML_NS}">{mathml}</math>"#)),
            ContentNode::InlineSlot { slot } => Ok(self.lookup(slot)?.to_string()),
            ContentNode::Paragraph { .. } | ContentNode::BlockSlot { .. } => Err(CompileError::schema(
                path,
                "block node inside a paragraph",
            )),
        }
    }

    fn lookup(&self, slot: &str) -> CompileResult<&str> {
        self.slots
            .get(slot)
            .map(String::as_str)
            .ok_or_else(|| SlotError::Missing(slot.to_string()).into())
    }
}
