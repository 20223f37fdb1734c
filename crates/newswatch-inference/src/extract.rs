//! Tolerant JSON extraction from model output.
//!
//! Models wrap their JSON in prose, markdown fences, or both. These
//! helpers find the first balanced JSON object or array in a string,
//! tracking string literals and escapes so braces inside quoted text
//! do not confuse the scan.

/// Extract the first balanced `{...}` object from text.
pub fn extract_json_object(text: &str) -> Option<&str> {
    extract_balanced(text, '{', '}')
}

/// Extract the first balanced `[...]` array from text.
pub fn extract_json_array(text: &str) -> Option<&str> {
    extract_balanced(text, '[', ']')
}

fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_plain() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
    }

    #[test]
    fn object_in_markdown_fence() {
        let text = "Here you go:\n```json\n{\"overall\": \"好\"}\n```";
        assert_eq!(extract_json_object(text), Some("{\"overall\": \"好\"}"));
    }

    #[test]
    fn object_nested() {
        let text = r#"prefix {"a": {"b": [1, 2]}} suffix"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": [1, 2]}}"#));
    }

    #[test]
    fn object_braces_inside_strings() {
        let text = r#"{"note": "uses } and { freely", "n": 1}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn object_escaped_quote_inside_string() {
        let text = r#"{"note": "say \"}\" loudly"}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn object_unbalanced_returns_none() {
        assert_eq!(extract_json_object(r#"{"a": 1"#), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn array_plain() {
        assert_eq!(extract_json_array("result: [3, 1, 2] done"), Some("[3, 1, 2]"));
    }

    #[test]
    fn array_nested_objects() {
        let text = r#"[{"i": 0}, {"i": 1}]"#;
        assert_eq!(extract_json_array(text), Some(text));
    }

    #[test]
    fn array_unclosed_returns_none() {
        assert_eq!(extract_json_array("[1, 2"), None);
    }
}
