//! Tolerant extraction of a tool call from an assistant's raw text
//! (spec.md §4.3 "Parser").
//!
//! Grounded on `original_source/core/agent.py::_extract_tool_json`: strip
//! markdown code fences, locate the outermost brace-balanced `{...}`
//! region (the original uses `text.index("{")`/`text.rindex("}")`, which
//! this port tightens to respect string-literal content so a `}` inside a
//! quoted value doesn't terminate the scan early), then parse permissively
//! (trailing commas, single-quoted strings) before falling back to strict
//! `serde_json`. Per spec.md §9's call to avoid `eval`-escalation, this is
//! a hand-rolled scanner, not a dependency on a "dirty JSON" crate.

use itak_types::tool::ToolCall;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*").unwrap());

/// Strips markdown code fences (` ```json ` and bare ` ``` `), matching
/// the original's two-pass `re.sub` calls.
fn strip_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").into_owned()
}

/// Finds the span of the outermost `{...}` region, respecting string
/// literals (a `{`/`}` inside a quoted string never affects brace depth).
/// Returns `None` if no balanced region exists.
fn find_outermost_braces(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = text.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut string_quote = b'"';
    let mut escaped = false;
    let mut end = None;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == string_quote {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => {
                in_string = true;
                string_quote = b;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i + 1);
                    break;
                }
            }
            _ => {}
        }
    }

    end.map(|e| (start, e))
}

/// Relaxes a brace-balanced JSON-ish region into strict JSON: trailing
/// commas before `}`/`]` are dropped, and single-quoted strings are
/// rewritten to double-quoted (escaping any embedded double quotes).
/// This is intentionally narrow -- it handles the two tolerances the
/// original's `dirty_json` fallback covers, not arbitrary malformed JSON.
fn relax(json_like: &str) -> String {
    // Operates on chars, not bytes: a single-quoted or trailing-comma
    // tool-arg value can contain any Unicode scalar value, and casting
    // bytes to char would mangle multibyte UTF-8 sequences.
    let chars: Vec<char> = json_like.chars().collect();
    let mut out = String::with_capacity(json_like.len());
    let mut i = 0;
    let mut in_double_string = false;
    let mut in_single_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_double_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_double_string = false;
            }
            i += 1;
            continue;
        }
        if in_single_string {
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '\'' {
                in_single_string = false;
                out.push('"');
                i += 1;
                continue;
            }
            if c == '"' {
                out.push('\\');
                out.push('"');
                i += 1;
                continue;
            }
            out.push(c);
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_double_string = true;
                out.push('"');
            }
            '\'' => {
                in_single_string = true;
                out.push('"');
            }
            ',' => {
                // Peek past whitespace for a closing brace/bracket: drop the
                // trailing comma if found.
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    // skip the comma entirely
                } else {
                    out.push(',');
                }
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out
}

/// Extracts a tool call from assistant text, or `None` if nothing
/// parsable is found (spec.md §4.3: "a parse miss returns nil").
pub fn extract_tool_call(text: &str) -> Option<ToolCall> {
    let stripped = strip_fences(text);
    let (start, end) = find_outermost_braces(&stripped)?;
    let candidate = &stripped[start..end];

    let value: Value = serde_json::from_str(candidate)
        .or_else(|_| serde_json::from_str(&relax(candidate)))
        .ok()?;

    let obj = value.as_object()?;
    let tool_name = obj.get("tool_name")?.as_str()?.to_string();
    let tool_args = obj
        .get("tool_args")
        .and_then(Value::as_object)
        .map(|m| m.clone().into_iter().collect())
        .unwrap_or_default();
    let thoughts = obj.get("thoughts").and_then(Value::as_array).map(|arr| {
        arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
    });
    let headline = obj.get("headline").and_then(Value::as_str).map(str::to_string);

    Some(ToolCall { tool_name, tool_args, thoughts, headline })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_plain_json() {
        let text = r#"{"tool_name":"response","tool_args":{"message":"hi"}}"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool_name, "response");
        assert_eq!(call.tool_args["message"], "hi");
    }

    #[test]
    fn strips_markdown_fences() {
        let text = "```json\n{\"tool_name\":\"search\",\"tool_args\":{}}\n```";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool_name, "search");
    }

    #[test]
    fn tolerates_trailing_comma() {
        let text = r#"{"tool_name":"response","tool_args":{"message":"hi",},}"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool_name, "response");
    }

    #[test]
    fn tolerates_single_quoted_strings() {
        let text = "{'tool_name': 'response', 'tool_args': {'message': 'hi'}}";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool_name, "response");
        assert_eq!(call.tool_args["message"], "hi");
    }

    #[test]
    fn relax_preserves_multibyte_utf8_in_single_quoted_values() {
        let text = "{'tool_name': 'response', 'tool_args': {'message': 'café'}}";
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool_args["message"], "café");
    }

    #[test]
    fn ignores_braces_inside_string_values() {
        let text = r#"Sure, here you go: {"tool_name":"response","tool_args":{"message":"curly: } end"}}"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.tool_name, "response");
        assert_eq!(call.tool_args["message"], "curly: } end");
    }

    #[test]
    fn returns_none_when_no_braces_present() {
        assert!(extract_tool_call("just plain text, no tool call here").is_none());
    }

    #[test]
    fn captures_thoughts_and_headline() {
        let text = r#"{"tool_name":"code_execution","tool_args":{},"thoughts":["step one","step two"],"headline":"Running code"}"#;
        let call = extract_tool_call(text).unwrap();
        assert_eq!(call.thoughts.unwrap(), vec!["step one", "step two"]);
        assert_eq!(call.headline.unwrap(), "Running code");
    }
}
