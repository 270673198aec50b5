//! Item Schema - the declarative input model
//!
//! Interactions and content nodes are closed tagged unions. Parsing goes
//! through `AssessmentItem::from_json`, which reports unknown discriminants as
//! `UnsupportedVariant` before structural deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{CompileError, CompileResult};
use crate::slots::is_valid_slot_name;
use crate::widgets::{WidgetRegistry, WidgetSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssessmentItem {
    pub identifier: String,
    pub title: String,
    pub body: Content,
    #[serde(default)]
    pub response_declarations: Vec<ResponseDeclaration>,
    #[serde(default)]
    pub widgets: BTreeMap<String, WidgetSpec>,
    #[serde(default)]
    pub interactions: BTreeMap<String, Interaction>,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Feedback {
    pub correct: Content,
    pub incorrect: Content,
}

/// Block content: raw markup, or a node tree rendering to the same markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Markup(String),
    Nodes(Vec<ContentNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentNode {
    Text { content: String },
    Math { mathml: String },
    Paragraph { content: Vec<ContentNode> },
    InlineSlot { slot: String },
    BlockSlot { slot: String },
}

impl ContentNode {
    pub fn is_inline(&self) -> bool {
        match self {
            Self::Text { .. } | Self::Math { .. } | Self::InlineSlot { .. } => true,
            Self::Paragraph { .. } | Self::BlockSlot { .. } => false,
        }
    }
}

// --- Responses ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResponseDeclaration {
    pub identifier: String,
    pub cardinality: Cardinality,
    pub base_type: BaseType,
    pub correct: CorrectValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Multiple,
    Ordered,
}

impl Cardinality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
            Self::Ordered => "ordered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Identifier,
    String,
    Integer,
    Float,
}

impl BaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }

    /// Whether `value` is a legal literal of this type.
    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Identifier => !value.is_empty() && !value.chars().any(char::is_whitespace),
            Self::String => true,
            Self::Integer => value.parse::<i64>().is_ok(),
            Self::Float => value.parse::<f64>().is_ok_and(f64::is_finite),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectValue {
    List(Vec<ScalarValue>),
    Scalar(ScalarValue),
}

impl CorrectValue {
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().map(ToString::to_string).collect(),
            Self::Scalar(item) => vec![item.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

// --- Interactions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Interaction {
    Choice(ChoiceInteraction),
    Order(OrderInteraction),
    TextEntry(TextEntryInteraction),
    InlineChoice(InlineChoiceInteraction),
}

impl Interaction {
    pub const KINDS: &'static [&'static str] = &["choice", "order", "textEntry", "inlineChoice"];

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Choice(_) => "choice",
            Self::Order(_) => "order",
            Self::TextEntry(_) => "textEntry",
            Self::InlineChoice(_) => "inlineChoice",
        }
    }

    pub fn response_identifier(&self) -> &str {
        match self {
            Self::Choice(i) => &i.response_identifier,
            Self::Order(i) => &i.response_identifier,
            Self::TextEntry(i) => &i.response_identifier,
            Self::InlineChoice(i) => &i.response_identifier,
        }
    }

    /// Identifiers of the selectable options; `None` for free-text entry.
    pub fn choice_identifiers(&self) -> Option<Vec<&str>> {
        match self {
            Self::Choice(i) => Some(i.choices.iter().map(|c| c.identifier.as_str()).collect()),
            Self::Order(i) => Some(i.choices.iter().map(|c| c.identifier.as_str()).collect()),
            Self::InlineChoice(i) => Some(i.choices.iter().map(|c| c.identifier.as_str()).collect()),
            Self::TextEntry(_) => None,
        }
    }

    /// Whether any option carries inline feedback.
    pub fn has_inline_feedback(&self) -> bool {
        match self {
            Self::Choice(i) => i.choices.iter().any(|c| c.feedback.is_some()),
            Self::Order(i) => i.choices.iter().any(|c| c.feedback.is_some()),
            Self::TextEntry(_) | Self::InlineChoice(_) => false,
        }
    }
}

fn default_true() -> bool { true }
fn default_one() -> u32 { 1 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChoiceInteraction {
    pub response_identifier: String,
    #[serde(default = "default_true")]
    pub shuffle: bool,
    /// 0 means unlimited.
    #[serde(default = "default_one")]
    pub max_choices: u32,
    #[serde(default = "default_one")]
    pub min_choices: u32,
    #[serde(default)]
    pub prompt: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderInteraction {
    pub response_identifier: String,
    #[serde(default = "default_true")]
    pub shuffle: bool,
    #[serde(default)]
    pub prompt: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextEntryInteraction {
    pub response_identifier: String,
    #[serde(default)]
    pub expected_length: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InlineChoiceInteraction {
    pub response_identifier: String,
    #[serde(default)]
    pub shuffle: bool,
    pub choices: Vec<InlineChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Choice {
    /// Stable grading key.
    pub identifier: String,
    pub content: String,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InlineChoice {
    pub identifier: String,
    pub content: String,
}

// --- Parsing ---

impl AssessmentItem {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        let raw: Value = serde_json::from_str(json)?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> CompileResult<Self> {
        check_discriminants(&raw)?;
        serde_json::from_value(raw).map_err(|e| CompileError::schema("item", e.to_string()))
    }

    /// Structural checks serde cannot express.
    pub fn validate_structure(&self) -> CompileResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(CompileError::schema("identifier", "must not be empty"));
        }
        if self.response_declarations.is_empty() {
            return Err(CompileError::schema(
                "responseDeclarations",
                "at least one response declaration is required",
            ));
        }

        let mut declared = BTreeMap::new();
        for (i, decl) in self.response_declarations.iter().enumerate() {
            let path = format!("responseDeclarations[{i}]");
            decl.validate(&path)?;
            if declared.insert(decl.identifier.as_str(), decl).is_some() {
                return Err(CompileError::schema(
                    path,
                    format!("duplicate response identifier '{}'", decl.identifier),
                ));
            }
        }

        for slot in self.widgets.keys() {
            check_slot_name(&format!("widgets.{slot}"), slot)?;
            if self.interactions.contains_key(slot) {
                return Err(CompileError::schema(
                    format!("widgets.{slot}"),
                    format!("slot '{slot}' is defined as both a widget and an interaction"),
                ));
            }
        }

        for (slot, interaction) in &self.interactions {
            let path = format!("interactions.{slot}");
            check_slot_name(&path, slot)?;
            let response_id = interaction.response_identifier();
            let decl = declared.get(response_id).ok_or_else(|| {
                CompileError::schema(
                    format!("{path}.responseIdentifier"),
                    format!("no response declaration named '{response_id}'"),
                )
            })?;
            validate_interaction(&path, interaction, decl)?;
        }

        Ok(())
    }
}

fn check_discriminants(raw: &Value) -> CompileResult<()> {
    if let Some(interactions) = raw.get("interactions").and_then(Value::as_object) {
        for interaction in interactions.values() {
            if let Some(kind) = interaction.get("type").and_then(Value::as_str) {
                if !Interaction::KINDS.contains(&kind) {
                    return Err(CompileError::UnsupportedVariant {
                        category: "interaction",
                        name: kind.to_string(),
                    });
                }
            }
        }
    }

    if let Some(widgets) = raw.get("widgets").and_then(Value::as_object) {
        let registry = WidgetRegistry::global();
        for widget in widgets.values() {
            if let Some(kind) = widget.get("type").and_then(Value::as_str) {
                if registry.get(kind).is_none() {
                    return Err(CompileError::UnsupportedVariant {
                        category: "widget",
                        name: kind.to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}

fn check_slot_name(path: &str, slot: &str) -> CompileResult<()> {
    if is_valid_slot_name(slot) {
        Ok(())
    } else {
        Err(CompileError::schema(
            path,
            format!("slot name '{slot}' must match [A-Za-z0-9_-]+"),
        ))
    }
}

impl ResponseDeclaration {
    fn validate(&self, path: &str) -> CompileResult<()> {
        if !BaseType::Identifier.accepts(&self.identifier) {
            return Err(CompileError::schema(
                path,
                format!("response identifier '{}' must be non-empty without whitespace", self.identifier),
            ));
        }

        let values = self.correct.values();
        if values.is_empty() {
            return Err(CompileError::schema(path, "no correct value declared"));
        }
        if self.cardinality == Cardinality::Single && values.len() != 1 {
            return Err(CompileError::schema(
                path,
                format!("single cardinality takes exactly one correct value, got {}", values.len()),
            ));
        }

        for value in &values {
            if self.base_type == BaseType::Identifier && value.chars().any(char::is_whitespace) {
                return Err(CompileError::schema(
                    format!("{path}.correct"),
                    format!(
                        "identifier value '{value}' contains whitespace; use the choice identifier, not its label"
                    ),
                ));
            }
            if !self.base_type.accepts(value) {
                return Err(CompileError::schema(
                    format!("{path}.correct"),
                    format!("'{value}' is not a valid {} value", self.base_type.as_str()),
                ));
            }
        }
        Ok(())
    }
}

fn validate_interaction(
    path: &str,
    interaction: &Interaction,
    decl: &ResponseDeclaration,
) -> CompileResult<()> {
    match interaction {
        Interaction::Choice(choice) => {
            if choice.max_choices != 0 && choice.min_choices > choice.max_choices {
                return Err(CompileError::schema(
                    path,
                    format!(
                        "minChoices {} exceeds maxChoices {}",
                        choice.min_choices, choice.max_choices
                    ),
                ));
            }
        }
        Interaction::TextEntry(entry) => {
            if entry.expected_length == Some(0) {
                return Err(CompileError::schema(
                    format!("{path}.expectedLength"),
                    "must be greater than zero",
                ));
            }
        }
        Interaction::Order(_) | Interaction::InlineChoice(_) => {}
    }

    let Some(ids) = interaction.choice_identifiers() else {
        return Ok(());
    };
    if ids.is_empty() {
        return Err(CompileError::schema(
            format!("{path}.choices"),
            "at least one choice is required",
        ));
    }

    let mut seen = BTreeSet::new();
    for id in &ids {
        if !BaseType::Identifier.accepts(id) {
            return Err(CompileError::schema(
                format!("{path}.choices"),
                format!("choice identifier '{id}' must be non-empty without whitespace"),
            ));
        }
        if !seen.insert(*id) {
            return Err(CompileError::schema(
                format!("{path}.choices"),
                format!("duplicate choice identifier '{id}'"),
            ));
        }
    }

    if decl.base_type == BaseType::Identifier {
        for value in decl.correct.values() {
            if !seen.contains(value.as_str()) {
                return Err(CompileError::schema(
                    format!("{path}.responseIdentifier"),
                    format!(
                        "correct value '{value}' of '{}' is not one of the choices",
                        decl.identifier
                    ),
                ));
            }
        }
    }

    Ok(())
}
