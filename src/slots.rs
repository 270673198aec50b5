//! Slot Resolution - named placeholders to rendered markup
//!
//! A placeholder is `<slot name="NAME"/>`. Substituted content is resolved
//! again, so slots may nest up to `MAX_SLOT_DEPTH` levels.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::sync::LazyLock;

use crate::error::SlotError;

/// Compile-time table of slot name to rendered markup. Never persisted.
pub type SlotMap = BTreeMap<String, String>;

pub const MAX_SLOT_DEPTH: usize = 10;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<slot\s+name="([A-Za-z0-9_-]+)"\s*/>"#).unwrap());
/// Anything that looks like a slot, including malformed spellings the
/// strict pattern skips.
static LOOSE_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<slot\b[^>]*>").unwrap());
static NAME_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name\s*=\s*["']([^"']*)["']"#).unwrap());
static SLOT_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Markup placeholder for `name`.
pub fn placeholder(name: &str) -> String {
    format!(r#"<slot name="{name}"/>"#)
}

pub fn is_valid_slot_name(name: &str) -> bool {
    SLOT_NAME.is_match(name)
}

/// Names referenced directly by `content`, without following substitutions.
pub fn referenced_slots(content: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}

pub struct SlotResolver<'a> {
    slots: &'a SlotMap,
}

impl<'a> SlotResolver<'a> {
    pub fn new(slots: &'a SlotMap) -> Self {
        Self { slots }
    }

    /// Replace every placeholder in `content`, recursively.
    ///
    /// Fails on a missing slot, a slot re-entered while it is still being
    /// resolved, nesting deeper than `MAX_SLOT_DEPTH`, or any slot-like tag
    /// left over afterwards.
    pub fn resolve(&self, content: &str) -> Result<String, SlotError> {
        let mut active = Vec::new();
        let resolved = self.resolve_at(content, 0, &mut active)?;

        let leftover = unresolved_slots(&resolved);
        if !leftover.is_empty() {
            return Err(SlotError::Unresolved(leftover));
        }
        Ok(resolved)
    }

    fn resolve_at(
        &self,
        content: &str,
        depth: usize,
        active: &mut Vec<String>,
    ) -> Result<String, SlotError> {
        let occurrences: Vec<(Range<usize>, String)> = PLACEHOLDER
            .captures_iter(content)
            .filter_map(|c| Some((c.get(0)?.range(), c.get(1)?.as_str().to_string())))
            .collect();

        let mut out = content.to_string();
        // Back to front so earlier ranges stay valid after each splice.
        for (range, name) in occurrences.into_iter().rev() {
            let slot = self
                .slots
                .get(&name)
                .ok_or_else(|| SlotError::Missing(name.clone()))?;

            if active.contains(&name) {
                let mut chain = active.clone();
                chain.push(name);
                return Err(SlotError::Cycle(chain));
            }
            if depth >= MAX_SLOT_DEPTH {
                return Err(SlotError::DepthExceeded {
                    name,
                    max: MAX_SLOT_DEPTH,
                });
            }

            active.push(name);
            let resolved = self.resolve_at(slot, depth + 1, active)?;
            active.pop();

            out.replace_range(range, &resolved);
        }

        tracing::trace!(depth, "slots resolved");
        Ok(out)
    }
}

fn unresolved_slots(content: &str) -> Vec<String> {
    LOOSE_PLACEHOLDER
        .find_iter(content)
        .map(|tag| {
            NAME_ATTR
                .captures(tag.as_str())
                .map_or_else(|| tag.as_str().to_string(), |c| c[1].to_string())
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
