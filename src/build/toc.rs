//! Table of contents collection.
//!
//! Walks the heading nodes of a parsed document and slugs their plain text.
//! The compiler's heading-slug pass computes anchors on its own with the same
//! [`Slugger`] and [`HeadingText`] rules, so both always agree.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;

use super::paths::Slugger;

/// A single entry in a document's table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub text: String,
    pub anchor: String,
    pub depth: u8,
}

impl TocEntry {
    pub fn url(&self) -> String {
        format!("#{}", self.anchor)
    }
}

/// Accumulates the plain text of a heading from its inline events.
#[derive(Debug, Default)]
pub(crate) struct HeadingText(String);

impl HeadingText {
    pub fn push(&mut self, event: &Event<'_>) {
        match event {
            Event::Text(text) | Event::Code(text) | Event::InlineMath(text) => {
                self.0.push_str(text)
            }
            Event::SoftBreak | Event::HardBreak => self.0.push(' '),
            _ => {}
        }
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Anchor for a finished heading: the explicit `{#id}` if present,
/// otherwise a fresh slug of its text.
pub(crate) fn heading_anchor(slugger: &mut Slugger, explicit: Option<&str>, text: &str) -> String {
    match explicit {
        Some(id) => {
            slugger.reserve(id);
            id.to_string()
        }
        None => slugger.slug(text),
    }
}

/// Collect the table of contents of a markdown body.
pub fn collect_toc(markdown: &str, options: Options) -> Vec<TocEntry> {
    let mut slugger = Slugger::new();
    let mut entries = Vec::new();
    let mut current: Option<(u8, Option<String>, HeadingText)> = None;

    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((level as u8, id.map(|id| id.to_string()), HeadingText::default()));
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((depth, id, text)) = current.take() {
                    let text = text.into_string();
                    let anchor = heading_anchor(&mut slugger, id.as_deref(), &text);
                    entries.push(TocEntry {
                        text: text.trim().to_string(),
                        anchor,
                        depth,
                    });
                }
            }
            ref other => {
                if let Some((_, _, text)) = current.as_mut() {
                    text.push(other);
                }
            }
        }
    }

    entries
}
