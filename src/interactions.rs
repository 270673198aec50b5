//! Interaction Compilation
//!
//! One markup form per interaction variant. Dispatch is an exhaustive match:
//! adding a variant does not compile until it is rendered here.

use crate::responses::FEEDBACK_INLINE;
use crate::schema::{
    Choice, ChoiceInteraction, InlineChoiceInteraction, Interaction, OrderInteraction,
    TextEntryInteraction,
};
use crate::xml::escape_attr;

pub fn compile(interaction: &Interaction) -> String {
    match interaction {
        Interaction::Choice(choice) => compile_choice(choice),
        Interaction::Order(order) => compile_order(order),
        Interaction::TextEntry(entry) => compile_text_entry(entry),
        Interaction::InlineChoice(inline) => compile_inline_choice(inline),
    }
}

fn compile_choice(interaction: &ChoiceInteraction) -> String {
    let attrs = format!(
        r#"response-identifier="{}" shuffle="{}" max-choices="{}" min-choices="{}""#,
        escape_attr(&interaction.response_identifier),
        interaction.shuffle,
        interaction.max_choices,
        interaction.min_choices,
    );
    choice_list(
        "qti-choice-interaction",
        &attrs,
        interaction.prompt.as_deref(),
        &interaction.choices,
    )
}

fn compile_order(interaction: &OrderInteraction) -> String {
    let attrs = format!(
        r#"response-identifier="{}" shuffle="{}""#,
        escape_attr(&interaction.response_identifier),
        interaction.shuffle,
    );
    choice_list(
        "qti-order-interaction",
        &attrs,
        interaction.prompt.as_deref(),
        &interaction.choices,
    )
}

fn choice_list(element: &str, attrs: &str, prompt: Option<&str>, choices: &[Choice]) -> String {
    let mut lines = vec![format!("<{element} {attrs}>")];
    if let Some(prompt) = prompt {
        lines.push(format!("<qti-prompt>{prompt}</qti-prompt>"));
    }
    for choice in choices {
        let id = escape_attr(&choice.identifier);
        let feedback = choice
            .feedback
            .as_deref()
            .map(|fb| {
                format!(
                    r#"<qti-feedback-inline outcome-identifier="{FEEDBACK_INLINE}" identifier="{id}" show-hide="show">{fb}</qti-feedback-inline>"#
                )
            })
            .unwrap_or_default();
        lines.push(format!(
            r#"<qti-simple-choice identifier="{id}">{}{feedback}</qti-simple-choice>"#,
            choice.content
        ));
    }
    lines.push(format!("</{element}>"));
    lines.join("\n")
}

fn compile_text_entry(interaction: &TextEntryInteraction) -> String {
    let length = interaction
        .expected_length
        .map(|n| format!(r#" expected-length="{n}""#))
        .unwrap_or_default();
    format!(
        r#"<qti-text-entry-interaction response-identifier="{}"{length}/>"#,
        escape_attr(&interaction.response_identifier)
    )
}

fn compile_inline_choice(interaction: &InlineChoiceInteraction) -> String {
    let options: String = interaction
        .choices
        .iter()
        .map(|c| {
            format!(
                r#"<qti-inline-choice identifier="{}">{}</qti-inline-choice>"#,
                escape_attr(&c.identifier),
                c.content
            )
        })
        .collect();
    format!(
        r#"<qti-inline-choice-interaction response-identifier="{}" shuffle="{}">{options}</qti-inline-choice-interaction>"#,
        escape_attr(&interaction.response_identifier),
        interaction.shuffle,
    )
}
