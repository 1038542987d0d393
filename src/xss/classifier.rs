// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reflection classifier
//!
//! Decides from the raw response text alone whether a reflected payload
//! landed somewhere it could execute. Rules run in a fixed order and the
//! first one that matches decides:
//!
//! 1. absent (raw), possibly present after entity decoding
//! 2. quoted JSON value with no markup nearby
//! 3. entity-escaped only
//! 4. used as an attribute name inside an open tag
//! 5. per-occurrence scan: unquoted attribute value, script block, text
//!    node, or plain body text with no markup nearby
//! 6. present, no rule matched
//!
//! This is a heuristic over text. Nothing is parsed as a DOM and nothing is
//! executed, so a verdict is a lead for manual confirmation.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use super::{Classification, GuessedContext, ReasonCode};

/// Chars inspected on each side of a `"key":"payload"` match
pub const JSON_WINDOW: usize = 60;

/// Chars inspected on each side of an occurrence during the positional scan
pub const SCAN_WINDOW: usize = 120;

/// Chars kept on each side of the deciding occurrence in the snippet
pub const SNIPPET_WINDOW: usize = 80;

lazy_static! {
    static ref TEXT_NODE: Regex = Regex::new(r">[^<]*<").unwrap();
    static ref EVENT_HANDLER_ATTR: Regex = Regex::new(r"\bon\w+\s*=").unwrap();
    static ref GENERIC_ATTR: Regex = Regex::new(r"\b[\w-]+\b\s*=").unwrap();
}

/// Classify how `payload` was reflected in `body`
///
/// Pure and deterministic.
pub fn classify(payload: &str, body: &str) -> Classification {
    if payload.is_empty() {
        return Classification::safe(ReasonCode::EmptyPayload);
    }

    if !body.contains(payload) {
        let decoded = html_escape::decode_html_entities(body);
        return if decoded.contains(payload) {
            Classification::safe(ReasonCode::EscapedInHtml)
        } else {
            Classification::safe(ReasonCode::NotPresent)
        };
    }

    if let Some(span) = json_value_occurrence(payload, body) {
        return Classification {
            snippet: snippet(body, span),
            ..Classification::safe(ReasonCode::JsonSafeReflection)
        };
    }

    // Raw form is present past rule 1, so this only fires if the ordering changes.
    if is_html_escaped(payload, body) {
        return Classification::safe(ReasonCode::HtmlEscaped);
    }

    if let Some(span) = attr_name_occurrence(payload, body) {
        return unsafe_at(ReasonCode::AttrNameDetected, body, span);
    }

    let mut from = 0;
    while let Some(offset) = body[from..].find(payload) {
        let pos = from + offset;
        if let Some(reason) = positional_verdict(body, pos, payload.len()) {
            return unsafe_at(reason, body, pos..pos + payload.len());
        }
        from = pos + payload.len();
    }

    let first = body.find(payload).unwrap_or(0);
    Classification {
        snippet: snippet(body, first..first + payload.len()),
        ..Classification::safe(ReasonCode::UnknownButPresent)
    }
}

/// Guess the markup context from a snippet
///
/// Priority: js > text > attr-value > attr-name > unknown.
pub fn guess_context(snippet: &str) -> GuessedContext {
    let s = snippet.to_lowercase();

    if s.contains("<script") || s.contains("</script>") {
        GuessedContext::Js
    } else if TEXT_NODE.is_match(&s) {
        GuessedContext::Text
    } else if EVENT_HANDLER_ATTR.is_match(&s) {
        GuessedContext::AttrValue
    } else if GENERIC_ATTR.is_match(&s) {
        GuessedContext::AttrName
    } else {
        GuessedContext::Unknown
    }
}

fn unsafe_at(reason: ReasonCode, body: &str, span: Range<usize>) -> Classification {
    let snippet = snippet(body, span);
    let context = Some(guess_context(&snippet));
    Classification {
        unsafe_reflection: true,
        reason,
        snippet,
        context,
    }
}

fn is_html_escaped(payload: &str, body: &str) -> bool {
    !body.contains(payload) && html_escape::decode_html_entities(body).contains(payload)
}

/// Span of the payload inside the first `"key":"payload"` pair that has
/// no `<` shortly before it and no `>` shortly after it
fn json_value_occurrence(payload: &str, body: &str) -> Option<Range<usize>> {
    // Built per call: the escaped payload is part of the pattern.
    let pattern = format!(r#""\s*[\w\-$@]+"\s*:\s*"({})""#, regex::escape(payload));
    let re = Regex::new(&pattern).ok()?;

    let found = re.captures_iter(body).find_map(|caps| {
        let whole = caps.get(0)?;
        let before = &body[back_chars(body, whole.start(), JSON_WINDOW)..whole.start()];
        let after = &body[whole.end()..forward_chars(body, whole.end(), JSON_WINDOW)];
        if before.contains('<') || after.contains('>') {
            None
        } else {
            caps.get(1).map(|m| m.range())
        }
    });
    found
}

/// Span of the payload where it stands as a bareword attribute name,
/// i.e. after whitespace or `/` inside an open tag and followed by `=` or `>`
///
/// Case folding may match a variant of different byte width, so callers
/// must use the returned span rather than the payload length.
fn attr_name_occurrence(payload: &str, body: &str) -> Option<Range<usize>> {
    // Built per call, same as the JSON pattern.
    let pattern = format!(
        r"(?i)<[a-z0-9:_-]+[^>]*[\s/]({})\s*(?:=|>)",
        regex::escape(payload)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
}

/// Verdict for one occurrence, `None` to move on to the next occurrence
fn positional_verdict(body: &str, pos: usize, len: usize) -> Option<ReasonCode> {
    let start = back_chars(body, pos, SCAN_WINDOW);
    let end = forward_chars(body, pos + len, SCAN_WINDOW);
    let window = &body[start..end];

    if !(window.contains('<') && window.contains('>')) {
        return Some(ReasonCode::PlainBodyReflection);
    }

    let left = &body[start..pos];
    let right = &body[pos + len..end];

    if in_unquoted_attribute(left, right) {
        Some(ReasonCode::UnquotedAttr)
    } else if in_script_block(left, right) {
        Some(ReasonCode::ScriptContext)
    } else if in_text_node(left, right) {
        Some(ReasonCode::InTextNode)
    } else {
        None
    }
}

/// Inside an open tag, after `=`, with no quote opened since the `=`
fn in_unquoted_attribute(left: &str, right: &str) -> bool {
    let Some(open) = left.rfind('<') else {
        return false;
    };
    let tag = &left[open..];
    if tag.contains('>') || !right.contains('>') {
        return false;
    }
    match tag.rfind('=') {
        Some(eq) => {
            let value = &tag[eq + 1..];
            !value.contains('"') && !value.contains('\'')
        }
        None => false,
    }
}

/// After a complete `<script ...>` opening tag that is not yet closed, with
/// the closing tag still ahead
fn in_script_block(left: &str, right: &str) -> bool {
    let left = left.to_ascii_lowercase();
    let Some(open) = left.rfind("<script") else {
        return false;
    };
    let block = &left[open..];
    block.contains('>')
        && !block.contains("</script")
        && right.to_ascii_lowercase().contains("</script>")
}

/// A `>` precedes with no `<` in between, and a `<` follows
fn in_text_node(left: &str, right: &str) -> bool {
    match left.rfind('>') {
        Some(gt) => !left[gt + 1..].contains('<') && right.contains('<'),
        None => false,
    }
}

fn snippet(body: &str, span: Range<usize>) -> String {
    let start = back_chars(body, span.start, SNIPPET_WINDOW);
    let end = forward_chars(body, span.end, SNIPPET_WINDOW);
    body[start..end].to_string()
}

/// Byte index `n` chars before `pos` (clamped to 0)
fn back_chars(s: &str, pos: usize, n: usize) -> usize {
    if n == 0 {
        return pos;
    }
    s[..pos]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Byte index `n` chars after `pos` (clamped to the end)
fn forward_chars(s: &str, pos: usize, n: usize) -> usize {
    s[pos..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| pos + i)
        .unwrap_or(s.len())
}
