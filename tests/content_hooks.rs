//! Content checks run on every compile and before any rendering.
//!
//! Run with `--features test-hooks`. Kept in its own binary so the global
//! counter is not shared with other tests.

#![cfg(feature = "test-hooks")]

use serde_json::json;

use qti_compiler::content_model::{get_content_check_count, reset_content_check_count};
use qti_compiler::{AssessmentItem, ItemCompiler};

#[test]
fn compile_checks_every_fragment_and_schema_failures_check_none() {
    let compiler = ItemCompiler::new();
    let mut raw = json!({
        "identifier": "hooks",
        "title": "Hooks",
        "body": r#"<p>Q</p><slot name="c"/>"#,
        "interactions": {
            "c": {
                "type": "choice",
                "responseIdentifier": "R",
                "prompt": "Pick",
                "choices": [
                    {"identifier": "A", "content": "<p>1</p>", "feedback": "No"},
                    {"identifier": "B", "content": "<p>2</p>"}
                ]
            }
        },
        "responseDeclarations": [
            {"identifier": "R", "cardinality": "single", "baseType": "identifier", "correct": "B"}
        ],
        "feedback": {"correct": "<p>ok</p>", "incorrect": "<p>no</p>"}
    });

    reset_content_check_count();
    compiler
        .compile(&AssessmentItem::from_value(raw.clone()).unwrap())
        .unwrap();
    // body, two feedback blocks, prompt, two choices, one choice feedback
    assert_eq!(get_content_check_count(), 7);

    raw["responseDeclarations"][0]["correct"] = json!("Z");
    reset_content_check_count();
    assert!(compiler
        .compile(&AssessmentItem::from_value(raw).unwrap())
        .is_err());
    assert_eq!(get_content_check_count(), 0);
}
