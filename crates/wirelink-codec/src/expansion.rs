//! Follow-up command construction for stub expansion.

/// Build the drill-down command for `property` of the value produced by
/// `command`.
///
/// The console never holds the real nested value, so expanding a stub means
/// re-running the original command with an index expression appended and
/// letting the remote agent evaluate the result afresh. The caller is
/// responsible for only expanding side-effect-free expressions; nothing here
/// verifies that.
#[must_use]
pub fn expand_command(command: &str, property: &str) -> String {
    format!("{command}[\"{}\"]", escape_property(property))
}

/// Escape a property name for use inside a double-quoted index expression.
fn escape_property(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_index_expression() {
        assert_eq!(expand_command("document", "foo"), r#"document["foo"]"#);
    }

    #[test]
    fn chains_onto_previous_expansions() {
        let first = expand_command("document", "body");
        assert_eq!(expand_command(&first, "style"), r#"document["body"]["style"]"#);
    }

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(expand_command("x", r#"a"b"#), r#"x["a\"b"]"#);
        assert_eq!(expand_command("x", r"a\b"), r#"x["a\\b"]"#);
    }
}
