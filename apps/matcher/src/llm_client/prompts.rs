// Shared prompt fragments.
// Each stage that calls a collaborator defines its own prompts.rs alongside it;
// this file only holds the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to resume-facing prompts.
pub const GROUNDING_INSTRUCTION: &str = "\
    CRITICAL: Base every statement on the supplied document only. \
    Do NOT infer, interpolate, or invent qualifications the text does not support.";

/// Fills `{name}` placeholders in a single pass over `template`.
///
/// Substituted values are copied verbatim and never rescanned, so caller text that
/// happens to contain `{resume_text}` stays literal. Braces that do not name a known
/// placeholder (JSON examples in a prompt) are left as written.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substitution = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match substitution {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_substitutes_known_placeholders() {
        let filled = fill_template(
            "Role: {title} at {company}.",
            &[("title", "Engineer"), ("company", "Acme")],
        );
        assert_eq!(filled, "Role: Engineer at Acme.");
    }

    #[test]
    fn test_fill_template_does_not_rescan_values() {
        let filled = fill_template(
            "JD: {job_description}\nResume: {resume_text}",
            &[
                ("job_description", "Paste {resume_text} here"),
                ("resume_text", "Jane Doe"),
            ],
        );
        assert_eq!(filled, "JD: Paste {resume_text} here\nResume: Jane Doe");
        assert_eq!(filled.matches("Jane Doe").count(), 1);
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        let filled = fill_template(
            r#"Return {"score": 0.5} for {name} and {missing}"#,
            &[("name", "x")],
        );
        assert_eq!(filled, r#"Return {"score": 0.5} for x and {missing}"#);
    }
}
