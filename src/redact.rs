use std::borrow::Cow;

const SECRET_JSON_FIELDS: [&str; 3] = ["access_token", "refresh_token", "password"];

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let nee = needle.as_bytes();
    if nee.is_empty() {
        return Some(0);
    }
    if nee.len() > hay.len() {
        return None;
    }

    (0..=hay.len() - nee.len()).find(|&i| {
        hay[i..i + nee.len()]
            .iter()
            .zip(nee)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    })
}

/// Replaces the value of every `"field": "value"` pair whose name is a known secret.
fn redact_json_field(text: String, field: &str) -> String {
    let needle = format!("\"{field}\"");
    if !text.contains(&needle) {
        return text;
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(idx) = rest.find(&needle) {
        let end = idx + needle.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let after_colon = rest.trim_start();
        let Some(after_colon) = after_colon.strip_prefix(':') else {
            continue;
        };
        let value = after_colon.trim_start();
        let Some(body) = value.strip_prefix('"') else {
            continue;
        };

        let prefix_len = rest.len() - value.len();
        out.push_str(&rest[..prefix_len]);

        let mut consumed = 0;
        let mut escaped = false;
        for ch in body.chars() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                break;
            }
            consumed += ch.len_utf8();
        }
        out.push_str("\"REDACTED");
        rest = &body[consumed..];
    }
    out.push_str(rest);
    out
}

fn redact_bearer(text: String) -> String {
    const HEADER: &str = "bearer ";
    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(idx) = find_ascii_case_insensitive(rest, HEADER) {
        let end = idx + HEADER.len();
        out.push_str(&rest[..end]);
        rest = &rest[end..];

        let consumed: usize = rest
            .chars()
            .take_while(|ch| !ch.is_whitespace() && *ch != '"' && *ch != ',')
            .map(char::len_utf8)
            .sum();
        if consumed > 0 {
            out.push_str("REDACTED");
        }
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    out
}

/// Strips bearer credentials and token/password JSON values from a message before it is logged.
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    let mut value = redact_bearer(input.to_string());
    for field in SECRET_JSON_FIELDS {
        value = redact_json_field(value, field);
    }

    if value == input {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_secrets_redacts_bearer_header_line() {
        let input = "Authorization: Bearer eyJhbGciOi.abc\nOther: ok\n";
        let out = redact_secrets(input).to_string();
        assert_eq!(out, "Authorization: Bearer REDACTED\nOther: ok\n");
    }

    #[test]
    fn redact_secrets_redacts_token_fields_in_json_bodies() {
        let input = r#"{"access_token": "aaa", "refresh_token":"r\"r", "user": {"email": "a@b.c"}}"#;
        let out = redact_secrets(input).to_string();
        assert!(!out.contains("aaa"));
        assert!(!out.contains(r#"r\"r"#));
        assert!(out.contains(r#""access_token": "REDACTED""#));
        assert!(out.contains(r#""refresh_token":"REDACTED""#));
        assert!(out.contains("a@b.c"));
    }

    #[test]
    fn redact_secrets_borrows_when_nothing_to_redact() {
        let input = "HTTP 500 from /projects";
        assert!(matches!(redact_secrets(input), Cow::Borrowed(_)));
    }
}
