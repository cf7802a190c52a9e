//! Prompt templates and placeholder substitution.
//!
//! Templates use `{{KEY}}` placeholders. Rendering is a single pass: values
//! are inserted verbatim and never rescanned, so generated text that happens
//! to contain braces cannot inject further substitutions.

use regex::Regex;
use std::sync::LazyLock;

use crate::errors::{Result, StepwiseError};

/// Decomposes a topic into an ordered set of stages.
pub const STRUCTURE: &str = "\
You are a science educator planning an illustrated, step-by-step explanation.

Topic: {{TOPIC}}
Audience: {{TARGET_AUDIENCE}}. Tone: {{TONE}}.
Write every field in {{LANGUAGE}}.

Break the topic down into a natural process with between {{MIN_STEPS}} and {{MAX_STEPS}} \
sequential stages. Each stage must describe a distinct moment of the process, and the \
stages must read in chronological or causal order.

Return:
- processName: the name of the process
- domain: the scientific field it belongs to
- overviewText: two or three sentences summarising the whole process
- suggestedSteps: the number of stages
- stepTitles: exactly suggestedSteps short stage titles, in order
";

/// Narrates one stage against everything narrated before it.
pub const NARRATION: &str = "\
You are writing stage {{STEP_NUMBER}} of {{TOTAL_STEPS}} of an illustrated explanation of \
\"{{PROCESS_NAME}}\".

Stage title: {{STEP_TITLE}}
Audience: {{TARGET_AUDIENCE}}. Tone: {{TONE}}.
Write in {{LANGUAGE}}.

What has been covered so far:
{{ACCUMULATED_CONTEXT}}

Describe only what happens during this stage. Do not repeat anything already covered \
above and do not anticipate later stages.

Return:
- stepNumber: {{STEP_NUMBER}}
- title: the stage title
- description: three to five sentences about this stage only
- keyEvents: two or three short phrases naming the moments to show visually
";

/// Plans the image for one stage of a process.
pub const VISUAL_PLAN: &str = "\
You are the art director of an educational infographic series about \"{{PROCESS_NAME}}\" \
({{DOMAIN}}). Plan the image for stage {{STEP_NUMBER}} of {{TOTAL_STEPS}}.

Stage title: {{STEP_TITLE}}
What happens: {{DESCRIPTION}}
Key events to show:
{{KEY_EVENTS}}

Visual style: {{STYLE}}
Audience: {{TARGET_AUDIENCE}}
Every word that appears in the image must be in {{LANGUAGE}}.

{{CONSISTENCY_BLOCK}}

Return a design object (title, badge, palette, technique, layout, textRules) and a scene \
object (composition, focalPoint, labels, explanations, callouts, inputsOutputs). Colors \
must be concrete hex values.
";

/// Proposes candidate facts from a scientific domain for single-image mode.
pub const FACTS: &str = "\
Suggest {{COUNT}} surprising, accurate facts from the field of {{DOMAIN}} for \
{{TARGET_AUDIENCE}}.
Tone: {{TONE}}. Write in {{LANGUAGE}}.

Each fact must be different in subject and suitable for a single illustrated explanation.

Return a list where each item has:
- domain: the scientific field
- title: a short, catchy title
- text: a clear explanation of two to four sentences
";

/// Explains one concept for single-image mode.
pub const CONCEPT: &str = "\
Explain the concept \"{{CONCEPT}}\" for {{TARGET_AUDIENCE}}.
Tone: {{TONE}}. Write in {{LANGUAGE}}.

Return:
- domain: the scientific field
- title: a short, catchy title
- text: a clear explanation of three to five sentences
";

/// Plans a standalone infographic for single-image mode.
pub const SINGLE_PLAN: &str = "\
You are the art director of an educational infographic about \"{{TITLE}}\" ({{DOMAIN}}).

Content to explain:
{{TEXT}}

Visual style: {{STYLE}}
Audience: {{TARGET_AUDIENCE}}
Every word that appears in the image must be in {{LANGUAGE}}.

Invent a complete design: title styling with a concrete hex color, a badge style, a \
palette of three to five concept colors, an illustration technique, a layout and text \
rules. Then describe the scene. Return a design object and a scene object. Colors must be \
concrete hex values.
";

static PLACEHOLDER: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}"));

/// Substitutes every `{{KEY}}` placeholder in `template`.
///
/// Fails with [`StepwiseError::Template`] if the template names a key that
/// `vars` does not provide.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String> {
    let re = PLACEHOLDER
        .as_ref()
        .map_err(|e| StepwiseError::Template(format!("invalid placeholder regex: {e}")))?;

    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    let mut missing = Vec::new();

    for cap in re.captures_iter(template) {
        let (Some(whole), Some(key)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        out.push_str(&template[last..whole.start()]);
        match vars.iter().find(|(name, _)| *name == key.as_str()) {
            Some((_, value)) => out.push_str(value),
            None => missing.push(key.as_str().to_string()),
        }
        last = whole.end();
    }
    out.push_str(&template[last..]);

    if missing.is_empty() {
        Ok(out)
    } else {
        missing.dedup();
        Err(StepwiseError::Template(format!(
            "unresolved placeholders: {}",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_substitutes_all() {
        let out = render("{{A}} and {{B_C}} and {{A}}", &[("A", "x"), ("B_C", "y")]).unwrap();
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn test_render_reports_missing_keys() {
        let err = render("{{TOPIC}} for {{TARGET_AUDIENCE}}", &[("TOPIC", "tides")]).unwrap_err();
        match err {
            StepwiseError::Template(msg) => assert!(msg.contains("TARGET_AUDIENCE")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_inserted_values_are_not_rescanned() {
        let out = render("plan: {{PLAN}}", &[("PLAN", "keep {{LITERAL}} as is")]).unwrap();
        assert_eq!(out, "plan: keep {{LITERAL}} as is");
    }

    #[test]
    fn test_lowercase_braces_are_left_alone() {
        let out = render("{{name}} {{X}}", &[("X", "1")]).unwrap();
        assert_eq!(out, "{{name}} 1");
    }

    #[test]
    fn test_placeholder_pattern_compiled_once() {
        let first = PLACEHOLDER.as_ref().unwrap();
        render("{{A}}", &[("A", "x")]).unwrap();
        assert!(std::ptr::eq(first, PLACEHOLDER.as_ref().unwrap()));
    }

    #[test]
    fn test_facts_template_keys() {
        let out = render(
            FACTS,
            &[
                ("COUNT", "5"),
                ("DOMAIN", "Astronomy"),
                ("TARGET_AUDIENCE", "children"),
                ("TONE", "playful"),
                ("LANGUAGE", "French"),
            ],
        )
        .unwrap();
        assert!(out.starts_with("Suggest 5 surprising"));
        assert!(out.contains("field of Astronomy"));
        assert!(out.contains("Write in French."));
    }

    #[test]
    fn test_structure_template_keys() {
        let out = render(
            STRUCTURE,
            &[
                ("TOPIC", "Photosynthesis"),
                ("TARGET_AUDIENCE", "adults"),
                ("TONE", "precise"),
                ("LANGUAGE", "English"),
                ("MIN_STEPS", "3"),
                ("MAX_STEPS", "8"),
            ],
        )
        .unwrap();
        assert!(out.contains("Topic: Photosynthesis"));
        assert!(out.contains("between 3 and 8"));
    }
}
