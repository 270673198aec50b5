//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use serde_json::{json, Value};

use qti_compiler::{
    AssessmentItem, CompileError, ContentContext, ItemCompiler, SlotError, SlotMap, SlotResolver,
};

fn text_entry_item() -> Value {
    json!({
        "identifier": "half",
        "title": "One half",
        "body": r#"<p>Q</p><slot name="t"/>"#,
        "interactions": {
            "t": {"type": "textEntry", "responseIdentifier": "R", "expectedLength": 5}
        },
        "responseDeclarations": [
            {"identifier": "R", "cardinality": "single", "baseType": "string", "correct": "0.5"}
        ],
        "feedback": {"correct": "<p>ok</p>", "incorrect": "<p>no</p>"}
    })
}

fn choice_item() -> Value {
    json!({
        "identifier": "pick",
        "title": "Pick one",
        "body": r#"<p>Which is even?</p><slot name="a"/>"#,
        "interactions": {
            "a": {
                "type": "choice",
                "responseIdentifier": "R",
                "prompt": "Choose",
                "choices": [
                    {"identifier": "A", "content": "<p>3</p>"},
                    {"identifier": "B", "content": "<p>4</p>"}
                ]
            }
        },
        "responseDeclarations": [
            {"identifier": "R", "cardinality": "single", "baseType": "identifier", "correct": "B"}
        ],
        "feedback": {"correct": "<p>ok</p>", "incorrect": "<p>no</p>"}
    })
}

fn compile(raw: Value) -> Result<String, CompileError> {
    ItemCompiler::new().compile(&AssessmentItem::from_value(raw)?)
}

fn section<'a>(doc: &'a str, open: &str, close: &str) -> &'a str {
    let start = doc.find(open).expect("section open");
    let end = doc[start..].find(close).expect("section close") + start;
    &doc[start..end]
}

#[test]
fn invariant_end_to_end_text_entry() {
    let doc = compile(text_entry_item()).unwrap();

    assert!(doc.contains(r#"<qti-text-entry-interaction response-identifier="R" expected-length="5"/>"#));

    let correct = section(&doc, "<qti-correct-response>", "</qti-correct-response>");
    assert!(correct.contains("<qti-value>0.5</qti-value>"));
    assert!(correct.contains("<qti-value>.5</qti-value>"));

    let processing = section(&doc, "<qti-response-processing>", "</qti-response-processing>");
    assert_eq!(processing.matches("<qti-member>").count(), 1);
    assert!(processing.contains(r#"<qti-variable identifier="R"/>"#));
    assert!(!processing.contains("<qti-match>"));
}

#[test]
fn invariant_document_skeleton_is_fixed() {
    let doc = compile(text_entry_item()).unwrap();
    assert!(doc.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(doc.contains(r#"xmlns="http://www.imsglobal.org/xsd/imsqtiasi_v3p0""#));
    assert!(doc.contains(r#"identifier="half" title="One half""#));
    assert_eq!(doc.matches("<qti-response-declaration ").count(), 1);
    assert_eq!(doc.matches("<qti-outcome-declaration ").count(), 3);
    assert!(doc.contains(r#"<qti-outcome-declaration identifier="FEEDBACK-INLINE" cardinality="multiple""#));
    assert_eq!(doc.matches("<qti-feedback-block ").count(), 2);
    assert!(doc.contains(r#"identifier="CORRECT" show-hide="show"><qti-content-body><p>ok</p>"#));
    assert!(doc.contains(r#"identifier="INCORRECT" show-hide="show"><qti-content-body><p>no</p>"#));
    assert_eq!(doc.matches("<qti-response-processing>").count(), 1);
}

#[test]
fn invariant_identifier_with_whitespace_fails() {
    let mut raw = choice_item();
    raw["responseDeclarations"][0]["correct"] = json!("Option B");
    let err = compile(raw).unwrap_err();
    assert!(matches!(err, CompileError::SchemaViolation { .. }));
    assert!(err.to_string().contains("whitespace"));
}

#[test]
fn invariant_self_referencing_slot_is_a_cycle() {
    let mut raw = choice_item();
    raw["interactions"]["a"]["prompt"] = json!(r#"Choose <slot name="a"/>"#);
    let err = compile(raw).unwrap_err();
    assert!(matches!(
        err,
        CompileError::SlotResolution(SlotError::Cycle(ref chain)) if chain == &["a", "a"]
    ));
}

#[test]
fn invariant_indirect_cycle_is_detected() {
    let slots = SlotMap::from([
        ("a".to_string(), r#"<b><slot name="b"/></b>"#.to_string()),
        ("b".to_string(), r#"<i><slot name="a"/></i>"#.to_string()),
    ]);
    let err = SlotResolver::new(&slots).resolve(r#"<slot name="a"/>"#).unwrap_err();
    assert_eq!(err, SlotError::Cycle(vec!["a".into(), "b".into(), "a".into()]));
}

#[test]
fn invariant_block_slot_always_wraps() {
    let mut raw = choice_item();
    raw["body"] = json!([
        {"type": "paragraph", "content": [{"type": "text", "content": "Which is even?"}]},
        {"type": "blockSlot", "slot": "a"}
    ]);
    let doc = compile(raw).unwrap();
    assert!(doc.contains("<p>Which is even?</p><div><qti-choice-interaction"));
    assert!(doc.contains("</qti-choice-interaction></div>"));
}

#[test]
fn invariant_leftover_placeholder_fails() {
    let mut raw = choice_item();
    raw["body"] = json!(r#"<p>Q</p><slot name="a"/><slot name="not valid"/>"#);
    let err = compile(raw).unwrap_err();
    assert!(matches!(err, CompileError::SlotResolution(SlotError::Unresolved(_))));
}

#[test]
fn invariant_missing_slot_fails() {
    let mut raw = choice_item();
    raw["body"] = json!(r#"<p>Q</p><slot name="b"/>"#);
    let err = compile(raw).unwrap_err();
    assert!(matches!(err, CompileError::SlotResolution(SlotError::Missing(ref s)) if s == "b"));
}

#[test]
fn invariant_unknown_variants_are_rejected() {
    let mut raw = choice_item();
    raw["interactions"]["a"]["type"] = json!("hotspot");
    assert!(matches!(
        compile(raw).unwrap_err(),
        CompileError::UnsupportedVariant { category: "interaction", .. }
    ));

    let mut raw = choice_item();
    raw["widgets"] = json!({"w": {"type": "hologram"}});
    assert!(matches!(
        compile(raw).unwrap_err(),
        CompileError::UnsupportedVariant { category: "widget", .. }
    ));
}

#[test]
fn invariant_content_violation_names_context_and_fragment() {
    let mut raw = choice_item();
    raw["interactions"]["a"]["choices"][0]["content"] = json!(r#"<p><img src="x.png"></p>"#);
    match compile(raw).unwrap_err() {
        CompileError::ContentModelViolation { context, path, snippet, .. } => {
            assert_eq!(context, ContentContext::Block);
            assert_eq!(path, "interactions.a.choices.A");
            assert!(snippet.starts_with("<img"));
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn invariant_choice_content_may_open_with_inline_markup() {
    let mut raw = choice_item();
    raw["interactions"]["a"]["choices"][0]["content"] = json!("<span>3</span>");
    raw["interactions"]["a"]["choices"][1]["content"] = json!(r#"<img src="four.png" alt="four apples"/>"#);
    let doc = compile(raw).unwrap();
    assert!(doc.contains(r#"<qti-simple-choice identifier="A"><span>3</span></qti-simple-choice>"#));
    assert!(doc.contains(r#"alt="four apples"/></qti-simple-choice>"#));
}

#[test]
fn invariant_misspelled_interaction_field_fails() {
    let mut raw = text_entry_item();
    raw["interactions"]["t"] = json!({"type": "textEntry", "responseIdentifier": "R", "expectedLenght": 5});
    assert!(matches!(compile(raw).unwrap_err(), CompileError::SchemaViolation { .. }));
}

#[test]
fn invariant_inline_choice_options_are_inline_only() {
    let raw = json!({
        "identifier": "dd",
        "title": "Dropdown",
        "body": r#"<p>The value <slot name="dd"/> as x grows.</p>"#,
        "interactions": {
            "dd": {
                "type": "inlineChoice",
                "responseIdentifier": "R",
                "choices": [
                    {"identifier": "up", "content": "increases"},
                    {"identifier": "down", "content": "<math><mo>↓</mo></math>"}
                ]
            }
        },
        "responseDeclarations": [
            {"identifier": "R", "cardinality": "single", "baseType": "identifier", "correct": "up"}
        ],
        "feedback": {"correct": "", "incorrect": ""}
    });
    match compile(raw).unwrap_err() {
        CompileError::ContentModelViolation { context, .. } => {
            assert_eq!(context, ContentContext::InlineOnly)
        }
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn invariant_image_widgets_are_data_uris() {
    let mut raw = choice_item();
    raw["body"] = json!(r#"<p>Q</p><slot name="nl"/><slot name="a"/>"#);
    raw["widgets"] = json!({
        "nl": {"type": "numberLine", "min": 0, "max": 4, "tickInterval": 1, "points": [2]}
    });
    let doc = compile(raw).unwrap();
    assert!(doc.contains(r#"<img src="data:image/svg+xml;base64,"#));
    assert!(doc.contains(r#"alt="Number line from 0 to 4""#));
}

#[test]
fn invariant_compile_is_deterministic() {
    let compiler = ItemCompiler::new();
    let item = AssessmentItem::from_value(choice_item()).unwrap();
    let first = compiler.compile_manifest(&item).unwrap();
    for _ in 0..5 {
        assert_eq!(compiler.compile_manifest(&item).unwrap(), first);
    }
}

#[test]
fn invariant_item_hash_ignores_authoring_key_order() {
    let compiler = ItemCompiler::new();
    let a = compiler
        .compile_manifest(&AssessmentItem::from_value(text_entry_item()).unwrap())
        .unwrap();

    let reordered = r#"{
        "feedback": {"incorrect": "<p>no</p>", "correct": "<p>ok</p>"},
        "responseDeclarations": [
            {"correct": "0.5", "baseType": "string", "cardinality": "single", "identifier": "R"}
        ],
        "interactions": {"t": {"expectedLength": 5, "responseIdentifier": "R", "type": "textEntry"}},
        "body": "<p>Q</p><slot name=\"t\"/>",
        "title": "One half",
        "identifier": "half"
    }"#;
    let b = compiler
        .compile_manifest(&AssessmentItem::from_json(reordered).unwrap())
        .unwrap();

    assert_eq!(a.item_hash, b.item_hash);
    assert_eq!(a.document_hash, b.document_hash);
    assert_eq!(a.item_hash.len(), 64);
}

#[test]
fn invariant_failure_yields_no_document() {
    let mut raw = text_entry_item();
    raw["interactions"]["t"]["expectedLength"] = json!(0);
    assert!(compile(raw).is_err());
}
