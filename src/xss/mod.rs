// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Reflected XSS payloads and reflection classification
//!
//! - Context-tagged payload catalog with a per-run marker
//! - Static classification of how a payload came back in a response body
//! - Best-effort guess of the markup context of an unsafe reflection

mod classifier;
mod payloads;

pub use classifier::{classify, guess_context, JSON_WINDOW, SCAN_WINDOW, SNIPPET_WINDOW};
pub use payloads::{
    generate, generate_marker, Payload, PayloadCatalog, DEFAULT_MARKER_LENGTH, TEMPLATE_VERSION,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Markup location a payload is built to break out of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextTag {
    /// HTML text between tags
    Text,
    /// Value of an attribute
    AttrValue,
    /// Attribute name position inside an open tag
    AttrName,
    /// Inside a script block or JS string
    Js,
}

impl ContextTag {
    /// All tags, in catalog order
    pub const ALL: [ContextTag; 4] = [
        ContextTag::Text,
        ContextTag::AttrValue,
        ContextTag::AttrName,
        ContextTag::Js,
    ];

    /// Wire name of the tag
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextTag::Text => "text",
            ContextTag::AttrValue => "attr-value",
            ContextTag::AttrName => "attr-name",
            ContextTag::Js => "js",
        }
    }
}

impl fmt::Display for ContextTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ContextTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == normalized)
            .ok_or_else(|| Error::config(format!("Unknown context tag: {}", s)))
    }
}

/// Context inferred from the snippet around an unsafe reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuessedContext {
    Js,
    Text,
    AttrValue,
    AttrName,
    Unknown,
}

impl GuessedContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuessedContext::Js => "js",
            GuessedContext::Text => "text",
            GuessedContext::AttrValue => "attr-value",
            GuessedContext::AttrName => "attr-name",
            GuessedContext::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GuessedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reflection was judged safe or unsafe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReasonCode {
    /// Nothing to look for
    EmptyPayload,
    /// Payload absent, raw and decoded
    NotPresent,
    /// Payload only present after entity decoding
    EscapedInHtml,
    /// Payload is a quoted JSON value with no markup nearby
    JsonSafeReflection,
    /// Raw payload absent, decoded form present
    HtmlEscaped,
    /// Payload used as an attribute name inside an open tag
    AttrNameDetected,
    /// Payload inside an unquoted attribute value
    UnquotedAttr,
    /// Payload inside a script block
    ScriptContext,
    /// Payload in a text node between tags
    InTextNode,
    /// Payload in a region with no tag markup nearby
    PlainBodyReflection,
    /// Present, but no rule matched
    UnknownButPresent,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::EmptyPayload => "empty-payload",
            ReasonCode::NotPresent => "not-present",
            ReasonCode::EscapedInHtml => "escaped-in-html",
            ReasonCode::JsonSafeReflection => "json-safe-reflection",
            ReasonCode::HtmlEscaped => "html-escaped",
            ReasonCode::AttrNameDetected => "attr-name-detected",
            ReasonCode::UnquotedAttr => "unquoted-attr",
            ReasonCode::ScriptContext => "script-context",
            ReasonCode::InTextNode => "in-text-node",
            ReasonCode::PlainBodyReflection => "plain-body-reflection",
            ReasonCode::UnknownButPresent => "unknown-but-present",
        }
    }

    /// Whether this reason marks the reflection as potentially exploitable
    pub fn is_unsafe(&self) -> bool {
        matches!(
            self,
            ReasonCode::AttrNameDetected
                | ReasonCode::UnquotedAttr
                | ReasonCode::ScriptContext
                | ReasonCode::InTextNode
                | ReasonCode::PlainBodyReflection
        )
    }

    /// Whether this is the conservative default rather than a positive rule
    pub fn is_fallback(&self) -> bool {
        matches!(self, ReasonCode::UnknownButPresent)
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one (payload, body) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Reflection looks exploitable
    pub unsafe_reflection: bool,
    /// Rule that decided the verdict
    pub reason: ReasonCode,
    /// Body text around the deciding occurrence (empty when not present raw)
    pub snippet: String,
    /// Context guess, only for unsafe verdicts
    pub context: Option<GuessedContext>,
}

impl Classification {
    pub(crate) fn safe(reason: ReasonCode) -> Self {
        Self {
            unsafe_reflection: false,
            reason,
            snippet: String::new(),
            context: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_tag_parse() {
        assert_eq!("text".parse::<ContextTag>().unwrap(), ContextTag::Text);
        assert_eq!("Attr_Value".parse::<ContextTag>().unwrap(), ContextTag::AttrValue);
        assert_eq!(" js ".parse::<ContextTag>().unwrap(), ContextTag::Js);
        assert!("css".parse::<ContextTag>().unwrap_err().is_config());
    }

    #[test]
    fn test_context_tag_serde_names() {
        let json = serde_json::to_string(&ContextTag::AttrName).unwrap();
        assert_eq!(json, "\"attr-name\"");
        for tag in ContextTag::ALL {
            assert_eq!(tag.as_str().parse::<ContextTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_reason_codes() {
        assert!(ReasonCode::InTextNode.is_unsafe());
        assert!(!ReasonCode::JsonSafeReflection.is_unsafe());
        assert!(ReasonCode::UnknownButPresent.is_fallback());
        assert_eq!(
            serde_json::to_string(&ReasonCode::PlainBodyReflection).unwrap(),
            "\"plain-body-reflection\""
        );
        assert_eq!(ReasonCode::UnquotedAttr.to_string(), "unquoted-attr");
    }
}
