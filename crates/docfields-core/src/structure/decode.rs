//! Best-effort decoding of JSON-ish model replies.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

lazy_static! {
    static ref FENCE: Regex = Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n?(.*?)```").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
    static ref DOUBLED_QUOTES: Regex = Regex::new(r#"""([^",}\]:\s][^"]*)"""#).unwrap();
}

/// Decode a model reply into a JSON object.
///
/// Code fences and surrounding prose are stripped; if the object still
/// does not parse, a repair pass is tried once. `None` means the reply
/// holds nothing usable.
pub fn decode_reply(reply: &str) -> Option<Map<String, Value>> {
    let body = strip_fences(reply);
    let object = extract_object(body)?;

    parse_object(object).or_else(|| parse_object(&repair(object)))
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Content of the first fenced block, or the whole reply.
fn strip_fences(reply: &str) -> &str {
    FENCE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map_or(reply, |m| m.as_str())
}

/// From the first `{` to its balanced `}`; to the end if unbalanced.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' => quote = Some('"'),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    Some(&text[start..])
}

/// Fix the usual ways models break JSON.
pub fn repair(text: &str) -> String {
    let text = text
        .replace(['\u{201c}', '\u{201d}', '\u{201e}', '\u{201f}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let text = rewrite_tokens(&text);
    let text = DOUBLED_QUOTES.replace_all(&text, "\"$1\"");
    let text = TRAILING_COMMA.replace_all(&text, "$1");
    close_brackets(&text)
}

/// String-aware pass: drop `//` comments, turn single-quoted strings into
/// double-quoted ones, and map Python literals to JSON.
fn rewrite_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                out.push(c);
                let mut escaped = false;
                for c in chars.by_ref() {
                    out.push(c);
                    if escaped {
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(next) = chars.next() {
                                if next == '\'' {
                                    out.push('\'');
                                } else {
                                    out.push('\\');
                                    out.push(next);
                                }
                            }
                        }
                        '\'' => break,
                        '"' => out.push_str("\\\""),
                        _ => out.push(c),
                    }
                }
                out.push('"');
            }
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "None" => "null",
                    "True" => "true",
                    "False" => "false",
                    _ => &word,
                });
            }
            _ => out.push(c),
        }
    }
    out
}

/// Close brackets left open by a truncated reply.
fn close_brackets(text: &str) -> String {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
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
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                stack.pop();
            }
            _ => {}
        }
    }

    let mut out = text.trim_end().trim_end_matches(',').to_string();
    if in_string {
        out.push('"');
    }
    out.extend(stack.into_iter().rev());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn decoded(reply: &str) -> Value {
        Value::Object(decode_reply(reply).unwrap())
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(decoded(r#"{"total": "10.00"}"#), json!({"total": "10.00"}));
    }

    #[test]
    fn test_code_fence_and_prose() {
        let reply = "Sure! Here is the data:\n```json\n{\"total\": \"10.00\", \"date\": null}\n```\nLet me know.";
        assert_eq!(decoded(reply), json!({"total": "10.00", "date": null}));
    }

    #[test]
    fn test_prose_without_fence() {
        let reply = "The fields are {\"name\": \"A {b}\"} as requested.";
        assert_eq!(decoded(reply), json!({"name": "A {b}"}));
    }

    #[test]
    fn test_trailing_commas_and_comments() {
        let reply = "{\n  \"a\": 1, // first\n  \"b\": [1, 2,],\n}";
        assert_eq!(decoded(reply), json!({"a": 1, "b": [1, 2]}));
    }

    #[test]
    fn test_python_style_reply() {
        let reply = "{'name': 'ACME \"Ltd\"', 'paid': True, 'note': None}";
        assert_eq!(decoded(reply), json!({"name": "ACME \"Ltd\"", "paid": true, "note": null}));
    }

    #[test]
    fn test_smart_and_doubled_quotes() {
        assert_eq!(decoded("{\u{201c}total\u{201d}: \u{201c}5.00\u{201d}}"), json!({"total": "5.00"}));
        assert_eq!(decoded(r#"{"total": ""5.00"", "empty": ""}"#), json!({"total": "5.00", "empty": ""}));
    }

    #[test]
    fn test_truncated_reply() {
        assert_eq!(decoded(r#"{"a": "x", "b": ["y""#), json!({"a": "x", "b": ["y"]}));
    }

    #[test]
    fn test_unusable_replies() {
        assert_eq!(decode_reply(""), None);
        assert_eq!(decode_reply("[Mock Response] Extract the fields..."), None);
        assert_eq!(decode_reply("I cannot read this document."), None);
        assert_eq!(decode_reply("{ this is : not json at all"), None);
    }

    #[test]
    fn test_strings_untouched_by_repair() {
        let reply = r#"{"url": "http://example.com", "flag": "True",}"#;
        assert_eq!(decoded(reply), json!({"url": "http://example.com", "flag": "True"}));
    }
}
