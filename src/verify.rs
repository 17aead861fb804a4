// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Reflection Verification
 * Response-side verdicts: raw reflection, DOM marker rendering and the
 * context abstraction around a reflected payload
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::types::DOM_MARKER_CLASS;

static MARKER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(&format!(".{}", DOM_MARKER_CLASS)).unwrap());

/// Raw reflection verdict: the payload appears verbatim in the body.
pub fn verify_reflection(body: &str, payload: &str) -> bool {
    !payload.is_empty() && body.contains(payload)
}

/// DOM verdict: the parsed response contains a rendered element carrying
/// the marker class, i.e. the payload escaped text context and became
/// markup.
pub fn verify_dom_marker(body: &str) -> bool {
    if !body.contains(DOM_MARKER_CLASS) {
        return false;
    }
    let document = Html::parse_document(body);
    document.select(&MARKER_SELECTOR).next().is_some()
}

/// Context tag at a byte position in the body: inside a script block,
/// inside a tag (attribute position) or plain HTML text.
fn context_at(body: &str, pos: usize) -> &'static str {
    let before = &body[..pos];
    let opens = before.matches("<script").count();
    let closes = before.matches("</script").count();
    if opens > closes {
        return "inJS";
    }
    match (before.rfind('<'), before.rfind('>')) {
        (Some(lt), Some(gt)) if lt > gt => "inATTR",
        (Some(_), None) => "inATTR",
        _ => "inHTML",
    }
}

/// Tokenized context markers around every occurrence of the payload,
/// deduplicated. Used to confirm a reflection landed in the context the
/// job was built for.
pub fn abstraction(body: &str, payload: &str) -> Vec<String> {
    let mut contexts: Vec<String> = Vec::new();
    if payload.is_empty() {
        return contexts;
    }
    let mut offset = 0;
    while let Some(found) = body[offset..].find(payload) {
        let pos = offset + found;
        let ctx = context_at(body, pos).to_string();
        if !contexts.contains(&ctx) {
            contexts.push(ctx);
        }
        offset = pos + payload.len();
    }
    contexts
}

/// Deterministic context-match predicate: HTML-typed payloads accept any
/// reflection point; JS- and attribute-typed payloads require a matching
/// observed context.
pub fn context_matches(abs: &[String], inject_type: &str) -> bool {
    if inject_type.contains("inHTML") {
        return true;
    }
    abs.iter().any(|ctx| inject_type.contains(ctx.as_str()))
}

/// Rich context tags for a discovery marker, including the enclosing
/// quote flavor for script contexts (`inJS-double` / `inJS-single`).
pub fn injection_contexts(body: &str, marker: &str) -> Vec<String> {
    let mut contexts: Vec<String> = Vec::new();
    let mut offset = 0;
    while let Some(found) = body[offset..].find(marker) {
        let pos = offset + found;
        let base = context_at(body, pos);
        let tag = if base == "inJS" {
            match enclosing_quote(body, pos) {
                Some('"') => "inJS-double".to_string(),
                Some('\'') => "inJS-single".to_string(),
                Some('`') => "inJS-backtick".to_string(),
                _ => "inJS".to_string(),
            }
        } else if base == "inATTR" {
            match enclosing_quote(body, pos) {
                Some('"') => "inATTR-double".to_string(),
                Some('\'') => "inATTR-single".to_string(),
                _ => "inATTR".to_string(),
            }
        } else {
            base.to_string()
        };
        if !contexts.contains(&tag) {
            contexts.push(tag);
        }
        offset = pos + marker.len();
    }
    contexts
}

/// Nearest preceding quote character within a short window, taken as the
/// quote enclosing the reflection point.
fn enclosing_quote(body: &str, pos: usize) -> Option<char> {
    let mut start = pos.saturating_sub(80);
    while start > 0 && !body.is_char_boundary(start) {
        start -= 1;
    }
    body[start..pos]
        .chars()
        .rev()
        .find(|c| matches!(c, '"' | '\'' | '`'))
}

/// Evidence snippet: the source line containing the payload, numbered and
/// trimmed.
pub fn code_view(body: &str, payload: &str) -> String {
    if payload.is_empty() {
        return String::new();
    }
    for (idx, line) in body.lines().enumerate() {
        if line.contains(payload) {
            let trimmed = line.trim();
            let mut end = 300.min(trimmed.len());
            while !trimmed.is_char_boundary(end) {
                end -= 1;
            }
            return format!("{} line:  {}", idx + 1, &trimmed[..end]);
        }
    }
    String::new()
}
