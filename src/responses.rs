//! Response Compilation - correct-answer data and match logic
//!
//! Declarations carry every accepted spelling of each correct value.
//! Processing is a flat conjunction: all responses correct scores 1 and
//! selects CORRECT feedback, anything else scores 0 and selects INCORRECT.

use std::collections::BTreeSet;

use crate::equivalence::expand;
use crate::schema::{BaseType, Cardinality, ResponseDeclaration};
use crate::xml::{escape_attr, escape_text};

pub const SCORE: &str = "SCORE";
pub const FEEDBACK: &str = "FEEDBACK";
pub const FEEDBACK_INLINE: &str = "FEEDBACK-INLINE";

/// Accepted values for a declaration, declared values first.
///
/// Identifier responses are grading keys and ordered responses are exact
/// sequences, so neither is expanded. Numeric base types keep only variants
/// that are still literals of that type.
pub fn accepted_values(decl: &ResponseDeclaration) -> Vec<String> {
    let declared = decl.correct.values();
    if decl.cardinality == Cardinality::Ordered || decl.base_type == BaseType::Identifier {
        return declared;
    }

    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for value in &declared {
        if seen.insert(value.clone()) {
            out.push(value.clone());
        }
    }

    let expanded: BTreeSet<String> = declared.iter().flat_map(|v| expand(v)).collect();
    for variant in expanded {
        if decl.base_type.accepts(&variant) && seen.insert(variant.clone()) {
            out.push(variant);
        }
    }
    out
}

pub fn compile_declarations(decls: &[ResponseDeclaration]) -> String {
    decls.iter().map(compile_declaration).collect::<Vec<_>>().join("\n")
}

fn compile_declaration(decl: &ResponseDeclaration) -> String {
    let values = accepted_values(decl);
    tracing::debug!(
        response = %decl.identifier,
        declared = decl.correct.values().len(),
        accepted = values.len(),
        "expanded correct response"
    );

    let mut lines = vec![
        format!(
            r#"<qti-response-declaration identifier="{}" cardinality="{}" base-type="{}">"#,
            escape_attr(&decl.identifier),
            decl.cardinality.as_str(),
            decl.base_type.as_str(),
        ),
        "  <qti-correct-response>".to_string(),
    ];
    for value in values {
        lines.push(format!("    <qti-value>{}</qti-value>", escape_text(&value)));
    }
    lines.push("  </qti-correct-response>".to_string());
    lines.push("</qti-response-declaration>".to_string());
    lines.join("\n")
}

/// Response processing over all declarations.
///
/// `inline_feedback` names the responses whose choices carry inline
/// feedback; their values drive the inline feedback selector.
pub fn compile_processing(decls: &[ResponseDeclaration], inline_feedback: &[&str]) -> String {
    let mut lines = vec!["<qti-response-processing>".to_string()];

    let selectors: Vec<&ResponseDeclaration> = decls
        .iter()
        .filter(|d| d.cardinality != Cardinality::Ordered)
        .filter(|d| inline_feedback.contains(&d.identifier.as_str()))
        .collect();
    if !selectors.is_empty() {
        lines.push(format!(r#"  <qti-set-outcome-value identifier="{FEEDBACK_INLINE}">"#));
        lines.push("    <qti-multiple>".to_string());
        for decl in selectors {
            lines.push(format!(
                r#"      <qti-variable identifier="{}"/>"#,
                escape_attr(&decl.identifier)
            ));
        }
        lines.push("    </qti-multiple>".to_string());
        lines.push("  </qti-set-outcome-value>".to_string());
    }

    lines.push("  <qti-response-condition>".to_string());
    lines.push("    <qti-response-if>".to_string());
    lines.push("      <qti-and>".to_string());
    for decl in decls {
        let operator = match decl.cardinality {
            Cardinality::Ordered => "qti-match",
            Cardinality::Single | Cardinality::Multiple => "qti-member",
        };
        let id = escape_attr(&decl.identifier);
        lines.push(format!("        <{operator}>"));
        lines.push(format!(r#"          <qti-variable identifier="{id}"/>"#));
        lines.push(format!(r#"          <qti-correct identifier="{id}"/>"#));
        lines.push(format!("        </{operator}>"));
    }
    lines.push("      </qti-and>".to_string());
    lines.extend(set_outcomes("1", "CORRECT"));
    lines.push("    </qti-response-if>".to_string());
    lines.push("    <qti-response-else>".to_string());
    lines.extend(set_outcomes("0", "INCORRECT"));
    lines.push("    </qti-response-else>".to_string());
    lines.push("  </qti-response-condition>".to_string());
    lines.push("</qti-response-processing>".to_string());
    lines.join("\n")
}

fn set_outcomes(score: &str, feedback: &str) -> Vec<String> {
    vec![
        format!(
            r#"      <qti-set-outcome-value identifier="{SCORE}"><qti-base-value base-type="float">{score}</qti-base-value></qti-set-outcome-value>"#
        ),
        format!(
            r#"      <qti-set-outcome-value identifier="{FEEDBACK}"><qti-base-value base-type="identifier">{feedback}</qti-base-value></qti-set-outcome-value>"#
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CorrectValue, ScalarValue};

    fn decl(id: &str, cardinality: Cardinality, base_type: BaseType, values: &[&str]) -> ResponseDeclaration {
        let scalars: Vec<_> = values.iter().map(|v| ScalarValue::Text(v.to_string())).collect();
        ResponseDeclaration {
            identifier: id.into(),
            cardinality,
            base_type,
            correct: if scalars.len() == 1 {
                CorrectValue::Scalar(scalars[0].clone())
            } else {
                CorrectValue::List(scalars)
            },
        }
    }

    #[test]
    fn string_values_are_expanded_declared_first() {
        let d = decl("R", Cardinality::Single, BaseType::String, &["1/2"]);
        let values = accepted_values(&d);
        assert_eq!(values[0], "1/2");
        assert!(values.contains(&"0.5".to_string()));
        assert!(values.contains(&".5".to_string()));
    }

    #[test]
    fn identifiers_and_ordered_are_verbatim() {
        let ids = decl("R", Cardinality::Multiple, BaseType::Identifier, &["A", "C"]);
        assert_eq!(accepted_values(&ids), vec!["A", "C"]);

        let ordered = decl("O", Cardinality::Ordered, BaseType::String, &["1/2", "x=5"]);
        assert_eq!(accepted_values(&ordered), vec!["1/2", "x=5"]);
    }

    #[test]
    fn float_keeps_only_parseable_variants() {
        let d = decl("R", Cardinality::Single, BaseType::Float, &["0.5"]);
        assert_eq!(accepted_values(&d), vec!["0.5", ".5"]);
    }

    #[test]
    fn multiple_unions_each_member() {
        let d = decl("R", Cardinality::Multiple, BaseType::String, &["1/4", "x=2"]);
        let values = accepted_values(&d);
        for expected in ["1/4", "x=2", "0.25", ".25", "2=x", "x = 2"] {
            assert!(values.contains(&expected.to_string()), "{expected}");
        }
    }

    #[test]
    fn declaration_markup_escapes_values() {
        let d = decl("R", Cardinality::Single, BaseType::String, &["x<3"]);
        let out = compile_declarations(&[d]);
        assert!(out.starts_with(
            r#"<qti-response-declaration identifier="R" cardinality="single" base-type="string">"#
        ));
        assert!(out.contains("<qti-value>x&lt;3</qti-value>"));
        assert!(out.contains("<qti-value>3&gt;x</qti-value>"));
        assert_eq!(out.matches("<qti-correct-response>").count(), 1);
    }

    #[test]
    fn processing_uses_membership_or_sequence_match() {
        let decls = vec![
            decl("A", Cardinality::Single, BaseType::String, &["5"]),
            decl("B", Cardinality::Ordered, BaseType::Identifier, &["x", "y"]),
        ];
        let out = compile_processing(&decls, &[]);
        assert_eq!(out.matches("<qti-member>").count(), 1);
        assert_eq!(out.matches("<qti-match>").count(), 1);
        assert_eq!(out.matches("<qti-and>").count(), 1);
        assert!(out.contains(r#"<qti-base-value base-type="float">1</qti-base-value>"#));
        assert!(out.contains(r#"<qti-base-value base-type="identifier">INCORRECT</qti-base-value>"#));
        assert!(!out.contains(FEEDBACK_INLINE));
    }

    #[test]
    fn inline_feedback_selector_skips_ordered_responses() {
        let decls = vec![
            decl("A", Cardinality::Single, BaseType::Identifier, &["x"]),
            decl("B", Cardinality::Ordered, BaseType::Identifier, &["x", "y"]),
        ];
        let out = compile_processing(&decls, &["A", "B"]);
        assert!(out.contains(r#"<qti-set-outcome-value identifier="FEEDBACK-INLINE">"#));
        assert!(out.contains(r#"<qti-variable identifier="A"/>"#));
        assert_eq!(out.matches(r#"<qti-variable identifier="B"/>"#).count(), 1);
    }
}
