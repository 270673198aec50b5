//! Item Compilation Pipeline - Single Entry Point
//!
//! CRITICAL: compile MUST call validate_item internally. No bypass.
//!
//! schema check → content model check → slot map → body → responses → document

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CompilerConfig;
use crate::content_model::{ContentContext, ContentModelValidator};
use crate::error::{CompileError, CompileResult};
use crate::hashing::{compute_item_hash, sha256_hex};
use crate::interactions;
use crate::render::ContentRenderer;
use crate::responses::{self, FEEDBACK, FEEDBACK_INLINE, SCORE};
use crate::schema::{AssessmentItem, Content, ContentNode, Interaction};
use crate::slots::{referenced_slots, SlotMap, SlotResolver};
use crate::widgets::{self, PlaceholderRenderer, Widget, WidgetRegistry, WidgetRenderer};
use crate::xml::escape_attr;
use crate::ENGINE_VERSION;

pub const QTI_NAMESPACE: &str = "http://www.imsglobal.org/xsd/imsqtiasi_v3p0";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const QTI_SCHEMA_LOCATION: &str =
    "https://purl.imsglobal.org/spec/qti/v3p0/schema/xsd/imsqti_asiv3p0_v1p0.xsd";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledItem {
    pub identifier: String,
    pub engine_version: String,
    pub item_hash: String,
    pub document_hash: String,
    pub document: String,
}

/// The item compiler - single entry point for all compile operations
pub struct ItemCompiler {
    config: CompilerConfig,
    validator: ContentModelValidator,
    renderer: Box<dyn WidgetRenderer>,
}

impl ItemCompiler {
    pub fn new() -> Self {
        Self::with_config(CompilerConfig::default())
    }

    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            validator: ContentModelValidator::new(),
            renderer: Box::new(PlaceholderRenderer),
        }
    }

    /// Replace the widget renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn WidgetRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Validate an item: structure, referenced widgets, every fragment.
    ///
    /// This is the ONLY validation entry point. Returns the typed widgets.
    pub fn validate_item(&self, item: &AssessmentItem) -> CompileResult<BTreeMap<String, Widget>> {
        item.validate_structure()?;

        let registry = WidgetRegistry::global();
        let widgets = item
            .widgets
            .iter()
            .map(|(slot, spec)| Ok((slot.clone(), registry.validate(slot, spec)?)))
            .collect::<CompileResult<BTreeMap<_, _>>>()?;

        self.check_content(&item.body, "body")?;
        self.check_content(&item.feedback.correct, "feedback.correct")?;
        self.check_content(&item.feedback.incorrect, "feedback.incorrect")?;
        for (slot, interaction) in &item.interactions {
            self.check_interaction(interaction, &format!("interactions.{slot}"))?;
        }

        Ok(widgets)
    }

    /// Compile an item to a QTI document.
    ///
    /// CRITICAL: This ALWAYS calls validate_item internally.
    pub fn compile(&self, item: &AssessmentItem) -> CompileResult<String> {
        tracing::debug!(identifier = %item.identifier, "compiling item");

        // MANDATORY: validation before any rendering.
        let widgets = self.validate_item(item)?;

        let slots = self.build_slot_map(item, &widgets)?;
        tracing::debug!(slots = slots.len(), "slot map built");

        let body = self.resolve_content(&item.body, "body", &slots)?;
        let correct = self.resolve_content(&item.feedback.correct, "feedback.correct", &slots)?;
        let incorrect =
            self.resolve_content(&item.feedback.incorrect, "feedback.incorrect", &slots)?;

        let inline_feedback: Vec<&str> = item
            .interactions
            .values()
            .filter(|i| i.has_inline_feedback())
            .map(Interaction::response_identifier)
            .collect();
        let declarations = responses::compile_declarations(&item.response_declarations);
        let processing = responses::compile_processing(&item.response_declarations, &inline_feedback);

        let document = self.assemble(item, &declarations, &body, &correct, &incorrect, &processing);
        tracing::info!(
            identifier = %item.identifier,
            bytes = document.len(),
            "item compiled"
        );
        Ok(document)
    }

    /// Parse and compile an item from JSON.
    pub fn compile_json(&self, json: &str) -> CompileResult<String> {
        self.compile(&AssessmentItem::from_json(json)?)
    }

    /// Compile and describe the result with reproducibility hashes.
    pub fn compile_manifest(&self, item: &AssessmentItem) -> CompileResult<CompiledItem> {
        let document = self.compile(item)?;
        Ok(CompiledItem {
            identifier: item.identifier.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            item_hash: compute_item_hash(item)?,
            document_hash: sha256_hex(document.as_bytes()),
            document,
        })
    }

    fn check_content(&self, content: &Content, path: &str) -> CompileResult<()> {
        match content {
            Content::Markup(markup) => self.validator.validate(markup, ContentContext::Block, path),
            Content::Nodes(nodes) => self.check_nodes(nodes, path),
        }
    }

    /// Text nodes are escaped at render time; only math carries markup.
    fn check_nodes(&self, nodes: &[ContentNode], path: &str) -> CompileResult<()> {
        for (i, node) in nodes.iter().enumerate() {
            let node_path = format!("{path}[{i}]");
            match node {
                ContentNode::Math { mathml } => {
                    self.validator.validate(mathml, ContentContext::Mixed, &node_path)?
                }
                ContentNode::Paragraph { content } => {
                    self.check_nodes(content, &format!("{node_path}.content"))?
                }
                ContentNode::Text { .. }
                | ContentNode::InlineSlot { .. }
                | ContentNode::BlockSlot { .. } => {}
            }
        }
        Ok(())
    }

    fn check_interaction(&self, interaction: &Interaction, path: &str) -> CompileResult<()> {
        let (prompt, choices) = match interaction {
            Interaction::Choice(i) => (i.prompt.as_deref(), i.choices.as_slice()),
            Interaction::Order(i) => (i.prompt.as_deref(), i.choices.as_slice()),
            Interaction::InlineChoice(i) => {
                for choice in &i.choices {
                    self.validator.validate(
                        &choice.content,
                        ContentContext::InlineOnly,
                        &format!("{path}.choices.{}", choice.identifier),
                    )?;
                }
                return Ok(());
            }
            Interaction::TextEntry(_) => return Ok(()),
        };

        if let Some(prompt) = prompt {
            self.validator
                .validate(prompt, ContentContext::Mixed, &format!("{path}.prompt"))?;
        }
        for choice in choices {
            let choice_path = format!("{path}.choices.{}", choice.identifier);
            self.validator
                .validate(&choice.content, ContentContext::Block, &choice_path)?;
            if let Some(feedback) = &choice.feedback {
                self.validator.validate(
                    feedback,
                    ContentContext::Mixed,
                    &format!("{choice_path}.feedback"),
                )?;
            }
        }
        Ok(())
    }

    fn build_slot_map(
        &self,
        item: &AssessmentItem,
        widgets: &BTreeMap<String, Widget>,
    ) -> CompileResult<SlotMap> {
        let mut slots = SlotMap::new();

        for (slot, widget) in widgets {
            let rendered = self
                .renderer
                .render(widget)
                .map_err(|message| CompileError::WidgetRender {
                    slot: slot.clone(),
                    message,
                })?;
            let alt = item.widgets.get(slot).and_then(|spec| spec.alt.as_deref());
            slots.insert(slot.clone(), widgets::embed(widget, alt, rendered));
        }

        for (slot, interaction) in &item.interactions {
            slots.insert(slot.clone(), interactions::compile(interaction));
        }

        Ok(slots)
    }

    fn resolve_content(&self, content: &Content, path: &str, slots: &SlotMap) -> CompileResult<String> {
        let rendered = ContentRenderer::new(slots).render(content, path)?;
        tracing::trace!(path, referenced = ?referenced_slots(&rendered), "resolving slots");
        Ok(SlotResolver::new(slots).resolve(&rendered)?)
    }

    fn assemble(
        &self,
        item: &AssessmentItem,
        declarations: &str,
        body: &str,
        correct: &str,
        incorrect: &str,
        processing: &str,
    ) -> String {
        let root = format!(
            r#"<qti-assessment-item xmlns="{QTI_NAMESPACE}" xmlns:xsi="{XSI_NAMESPACE}" xsi:schemaLocation="{QTI_NAMESPACE} {QTI_SCHEMA_LOCATION}" identifier="{}" title="{}" time-dependent="{}" xml:lang="{}">"#,
            escape_attr(&item.identifier),
            escape_attr(&item.title),
            self.config.time_dependent,
            escape_attr(&self.config.language),
        );

        [
            r#"<?xml version="1.0" encoding="UTF-8"?>"#.to_string(),
            root,
            declarations.to_string(),
            format!(
                r#"<qti-outcome-declaration identifier="{SCORE}" cardinality="single" base-type="float"><qti-default-value><qti-value>0</qti-value></qti-default-value></qti-outcome-declaration>"#
            ),
            format!(r#"<qti-outcome-declaration identifier="{FEEDBACK}" cardinality="single" base-type="identifier"/>"#),
            format!(
                r#"<qti-outcome-declaration identifier="{FEEDBACK_INLINE}" cardinality="multiple" base-type="identifier"/>"#
            ),
            "<qti-item-body>".to_string(),
            body.to_string(),
            feedback_block("CORRECT", correct),
            feedback_block("INCORRECT", incorrect),
            "</qti-item-body>".to_string(),
            processing.to_string(),
            "</qti-assessment-item>".to_string(),
        ]
        .join("\n")
    }
}

fn feedback_block(identifier: &str, content: &str) -> String {
    format!(
        r#"<qti-feedback-block outcome-identifier="{FEEDBACK}" identifier="{identifier}" show-hide="show"><qti-content-body>{content}</qti-content-body></qti-feedback-block>"#
    )
}

impl Default for ItemCompiler {
    fn default() -> Self {
        Self::new()
    }
}
