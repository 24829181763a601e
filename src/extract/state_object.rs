//! Embedded JS state object extraction.
//!
//! AliExpress pages inline a large object literal (`window.runParams` and
//! friends) holding the server-rendered product data. The object is located by
//! name, carved out with a bracket-depth scan that respects string literals,
//! then parsed - strictly as JSON first, and through a tolerant repair pass
//! when the literal uses syntax JSON rejects (trailing commas, unquoted keys,
//! single-quoted strings).
//!
//! Known limitation: the scanner does not understand template or regex
//! literals, so a brace inside one of those in adjacent script text can
//! mis-scan. This matches the behavior of the heuristic it replaces.

use serde_json::Value;
use tracing::debug;

/// Candidate global names, in precedence order.
const STATE_GLOBALS: [&str; 5] = [
    "window.runParams",
    "runParams",
    "__AER_DATA__",
    "DCData",
    "INIT_DATA",
];

/// Occurrences tried per candidate name before moving on.
const MAX_SCANS_PER_NAME: usize = 4;

/// Locate and parse the first embedded state object in the page.
pub fn find_state_object(html: &str) -> Option<Value> {
    for name in STATE_GLOBALS {
        for (pos, _) in html.match_indices(name).take(MAX_SCANS_PER_NAME) {
            let tail = &html[pos + name.len()..];
            let Some(literal) = scan_object_literal(tail) else {
                continue;
            };
            if let Some(value) = parse_tolerant(literal) {
                debug!(global = name, len = literal.len(), "parsed embedded state object");
                return Some(value);
            }
        }
    }
    None
}

/// Carve out the object literal starting at the first `{` in `text`.
///
/// Tracks string-literal boundaries (both quote styles, with `\` escapes) so
/// braces inside strings do not affect depth. Returns the `{...}` slice
/// including both braces.
pub fn scan_object_literal(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == quote {
                in_string = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => in_string = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[open..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse an object literal: strict JSON first, then the repaired form.
pub fn parse_tolerant(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Some(value);
    }
    let repaired = repair_object_literal(raw);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "state object literal did not survive repair");
            None
        }
    }
}

/// Rewrite a JS object literal into strict JSON where possible.
///
/// Handles the three divergences AliExpress pages actually exhibit: unquoted
/// identifier keys, trailing commas, and single-quoted strings. The pass is
/// string-aware, so commas and identifiers inside string values are left
/// untouched.
fn repair_object_literal(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    let mut last_significant = '\0';
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                // Copy double-quoted strings verbatim
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    out.push(d);
                    i += 1;
                    if d == '\\' {
                        if i < chars.len() {
                            out.push(chars[i]);
                            i += 1;
                        }
                    } else if d == '"' {
                        break;
                    }
                }
                last_significant = '"';
            }
            '\'' => {
                // Re-quote single-quoted strings as double-quoted
                out.push('"');
                i += 1;
                while i < chars.len() {
                    let d = chars[i];
                    i += 1;
                    if d == '\\' {
                        if i < chars.len() {
                            let e = chars[i];
                            i += 1;
                            if e == '\'' {
                                out.push('\'');
                            } else {
                                out.push('\\');
                                out.push(e);
                            }
                        }
                    } else if d == '\'' {
                        break;
                    } else if d == '"' {
                        out.push('\\');
                        out.push('"');
                    } else {
                        out.push(d);
                    }
                }
                out.push('"');
                last_significant = '"';
            }
            ',' => {
                let mut j = i + 1;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                    // Trailing comma, drop it
                    i += 1;
                } else {
                    out.push(',');
                    last_significant = ',';
                    i += 1;
                }
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();

                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                let key_position = matches!(last_significant, '{' | ',' | '\0');
                if key_position && j < chars.len() && chars[j] == ':' {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                    last_significant = '"';
                } else {
                    // Value position: true/false/null and the like pass through
                    out.push_str(&ident);
                    last_significant = ident.chars().last().unwrap_or('\0');
                }
            }
            _ => {
                out.push(c);
                if !c.is_whitespace() {
                    last_significant = c;
                }
                i += 1;
            }
        }
    }
    out
}

/// Walk a dotted path through nested objects.
pub fn lookup<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = state;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Resolve a path either at the root or under the `data` wrapper that
/// `runParams` style objects carry.
pub fn lookup_rooted<'a>(state: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(state, path).or_else(|| state.get("data").and_then(|data| lookup(data, path)))
}

/// First non-empty string (or numeric rendered as string) across paths.
pub fn lookup_string(state: &Value, paths: &[&str]) -> Option<String> {
    for path in paths {
        let Some(value) = lookup_rooted(state, path) else {
            continue;
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !text.is_empty() {
            return Some(text);
        }
    }
    None
}
