//! Placeholder substitution for prompt templates.

/// Renders `template`, replacing each `{name}` token with its value from `vars`.
///
/// Substitution is single-pass: inserted values are never rescanned, so text that
/// itself contains `{name}` tokens (a question, an excerpt) is copied verbatim.
/// Braces that do not form a known placeholder are kept as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match substituted {
            Some((value, close)) => {
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
