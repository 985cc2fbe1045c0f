//! Structured-response parsing: pull one JSON object out of model output.
//!
//! The model is asked for bare JSON but routinely wraps it in a markdown
//! fence or surrounds it with prose. Only a fence at the very start or end
//! of the response is stripped; fences inside the payload (generated README
//! contents, say) are never touched. Extraction then takes everything from
//! the first `{` to the last `}`. When the stripped body does not parse, the
//! unstripped text is tried the same way. Output that carries explanatory
//! braces before or after the real object is mis-extracted and then fails to
//! parse. That is a known limit of the approach and is reported as
//! [`SkillError::MalformedResponse`].

use crate::error::{Result, SkillError};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Characters of context shown on each side of a parse error.
const WINDOW_RADIUS: usize = 40;

fn fence_open() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*\r?\n?")
            .unwrap_or_else(|e| panic!("fence regex: {e}"))
    })
}

fn fence_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\r?\n?[ \t]*```$").unwrap_or_else(|e| panic!("fence regex: {e}"))
    })
}

/// Remove a leading and a trailing fence marker, if present. Returns `None`
/// when there is nothing to strip.
fn strip_fence(text: &str) -> Option<&str> {
    let open = fence_open().find(text).map_or(0, |m| m.end());
    let body = &text[open..];
    let close = fence_close().find(body).map_or(body.len(), |m| m.start());
    if open == 0 && close == body.len() {
        return None;
    }
    Some(body[..close].trim())
}

/// Extract and parse the JSON object carried by `raw`.
pub fn parse(raw: &str) -> Result<Value> {
    let text = raw.trim();
    if let Some(body) = strip_fence(text) {
        if let Ok(value) = extract(body) {
            return Ok(value);
        }
    }
    extract(text)
}

/// First `{` to last `}`, parsed.
fn extract(text: &str) -> Result<Value> {
    let (start, end) = match (text.find('{'), text.rfind('}')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => {
            return Err(SkillError::MalformedResponse {
                message: "no JSON object found".to_string(),
                line: 1,
                column: 1,
                window: window_at(text, 0),
            })
        }
    };
    let slice = &text[start..=end];

    serde_json::from_str(slice).map_err(|e| {
        let offset = byte_offset(slice, e.line(), e.column());
        SkillError::MalformedResponse {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
            window: window_at(slice, offset),
        }
    })
}

/// Map serde_json's 1-based line/column to a byte offset into `text`.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

fn window_at(text: &str, offset: usize) -> String {
    let mut lo = offset.saturating_sub(WINDOW_RADIUS);
    while !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (offset + WINDOW_RADIUS).min(text.len());
    while !text.is_char_boundary(hi) {
        hi += 1;
    }
    text[lo..hi].replace('\n', " ")
}
