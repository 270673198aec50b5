//! Content Model Validation - Rules per Placement Context
//!
//! Rules locate offending constructs.
//! The validator decides which rules apply to a context and fails fast.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{CompileError, CompileResult};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static CONTENT_CHECK_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_content_check_count() -> u32 {
    CONTENT_CHECK_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_content_check_count() {
    CONTENT_CHECK_COUNT.store(0, Ordering::SeqCst);
}

/// Where a fragment is placed, from most to least permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentContext {
    /// Item body, feedback, choice content.
    Block,
    /// Interaction prompts: inline markup and math, no block elements.
    Mixed,
    /// Inline-choice options.
    InlineOnly,
}

impl fmt::Display for ContentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::Mixed => "mixed",
            Self::InlineOnly => "inline-only",
        })
    }
}

static LEGACY_REMNANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[☃|web\+graphie:").unwrap());
static BANNED_MATHML: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:mfenced|maction|mglyph)\b").unwrap());
static AUTHORING_ARTIFACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<!--\s*(?:Start|End)Fragment|class\s*=\s*"?Mso|<o:p\b|<w:\w+"#).unwrap()
});
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());
static ALT_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\salt\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:p|div|table|ul|ol|blockquote|pre|h[1-6]|hr)(?:\s|/|>)").unwrap()
});
static MATH_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<math(?:\s|/|>)").unwrap());
static INTERACTION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<qti-([a-z-]+)-interaction\b").unwrap());

/// A content rule reports the byte offset of the first offending construct.
pub trait ContentRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn applies_to(&self, context: ContentContext) -> bool;
    fn check(&self, fragment: &str) -> Option<usize>;
}

// --- Base rules, every context ---

pub struct LegacyRemnantRule;

impl ContentRule for LegacyRemnantRule {
    fn name(&self) -> &'static str { "legacy_remnant" }
    fn applies_to(&self, _: ContentContext) -> bool { true }
    fn check(&self, fragment: &str) -> Option<usize> {
        LEGACY_REMNANT.find(fragment).map(|m| m.start())
    }
}

pub struct MathMlRule;

impl ContentRule for MathMlRule {
    fn name(&self) -> &'static str { "disallowed_mathml" }
    fn applies_to(&self, _: ContentContext) -> bool { true }
    fn check(&self, fragment: &str) -> Option<usize> {
        BANNED_MATHML.find(fragment).map(|m| m.start())
    }
}

pub struct AuthoringArtifactRule;

impl ContentRule for AuthoringArtifactRule {
    fn name(&self) -> &'static str { "authoring_artifact" }
    fn applies_to(&self, _: ContentContext) -> bool { true }
    fn check(&self, fragment: &str) -> Option<usize> {
        AUTHORING_ARTIFACT.find(fragment).map(|m| m.start())
    }
}

pub struct ImageAltRule;

impl ContentRule for ImageAltRule {
    fn name(&self) -> &'static str { "image_missing_alt" }
    fn applies_to(&self, _: ContentContext) -> bool { true }
    fn check(&self, fragment: &str) -> Option<usize> {
        IMG_TAG.find_iter(fragment).find_map(|img| {
            let alt = ALT_ATTR
                .captures(img.as_str())
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().trim());
            match alt {
                Some(text) if !text.is_empty() => None,
                _ => Some(img.start()),
            }
        })
    }
}

// --- Context rules ---

/// Block content is empty, or opens with markup. A standalone `<math>` counts
/// as block-level.
pub struct BlockRootRule;

impl ContentRule for BlockRootRule {
    fn name(&self) -> &'static str { "block_root" }
    fn applies_to(&self, context: ContentContext) -> bool { context == ContentContext::Block }
    fn check(&self, fragment: &str) -> Option<usize> {
        let trimmed = fragment.trim_start();
        let offset = fragment.len() - trimmed.len();
        if trimmed.is_empty() || MATH_TAG.find(trimmed).is_some_and(|m| m.start() == 0) {
            return None;
        }
        if !trimmed.starts_with('<') {
            return Some(offset);
        }
        None
    }
}

pub struct BlockElementRule;

impl ContentRule for BlockElementRule {
    fn name(&self) -> &'static str { "block_element_in_inline_context" }
    fn applies_to(&self, context: ContentContext) -> bool { context != ContentContext::Block }
    fn check(&self, fragment: &str) -> Option<usize> {
        BLOCK_TAG.find(fragment).map(|m| m.start())
    }
}

pub struct InlineMathRule;

impl ContentRule for InlineMathRule {
    fn name(&self) -> &'static str { "math_in_inline_choice" }
    fn applies_to(&self, context: ContentContext) -> bool { context == ContentContext::InlineOnly }
    fn check(&self, fragment: &str) -> Option<usize> {
        MATH_TAG.find(fragment).map(|m| m.start())
    }
}

pub struct NestedInteractionRule;

impl ContentRule for NestedInteractionRule {
    fn name(&self) -> &'static str { "nested_interaction" }
    fn applies_to(&self, context: ContentContext) -> bool { context == ContentContext::InlineOnly }
    fn check(&self, fragment: &str) -> Option<usize> {
        INTERACTION_TAG
            .captures_iter(fragment)
            .find(|c| &c[1] != "inline-choice")
            .and_then(|c| c.get(0))
            .map(|m| m.start())
    }
}

/// Validator orchestrates rules per context. First violation wins.
pub struct ContentModelValidator {
    rules: Vec<Box<dyn ContentRule>>,
}

impl ContentModelValidator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(LegacyRemnantRule),
                Box::new(MathMlRule),
                Box::new(AuthoringArtifactRule),
                Box::new(ImageAltRule),
                Box::new(BlockRootRule),
                Box::new(BlockElementRule),
                Box::new(InlineMathRule),
                Box::new(NestedInteractionRule),
            ],
        }
    }

    /// Validate one fragment. `path` identifies the fragment inside the item.
    pub fn validate(&self, fragment: &str, context: ContentContext, path: &str) -> CompileResult<()> {
        #[cfg(feature = "test-hooks")]
        CONTENT_CHECK_COUNT.fetch_add(1, Ordering::SeqCst);

        for rule in self.rules.iter().filter(|r| r.applies_to(context)) {
            if let Some(offset) = rule.check(fragment) {
                return Err(CompileError::ContentModelViolation {
                    context,
                    path: path.to_string(),
                    rule: rule.name(),
                    snippet: snippet(fragment, offset),
                });
            }
        }
        Ok(())
    }
}

impl Default for ContentModelValidator {
    fn default() -> Self {
        Self::new()
    }
}

const SNIPPET_CHARS: usize = 40;

fn snippet(fragment: &str, offset: usize) -> String {
    let start = fragment.get(offset..).unwrap_or(fragment);
    let mut out: String = start.chars().take(SNIPPET_CHARS).collect();
    if start.chars().count() > SNIPPET_CHARS {
        out.push('…');
    }
    out
}
