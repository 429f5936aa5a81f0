//! Tag aggregation across published entries.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::warn;

use super::document::Entry;
use super::paths::{is_tag_segment, normalize_tag, tag_url};

/// A tag with the number of published entries carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    /// Normalised form, used in URLs and lookups
    pub name: String,
    /// First raw spelling seen
    pub display: String,
    pub count: usize,
    pub url: String,
}

/// Normalised tag -> count, derived from scratch each build.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    tags: BTreeMap<String, TagCount>,
}

impl TagIndex {
    /// Count tags across the given entries, ignoring drafts.
    ///
    /// A tag repeated on one entry (in any spelling) counts once for it.
    /// Tags that cannot name a page directory, such as `..`, are skipped.
    pub fn from_entries<'a, T: Entry + 'a>(entries: impl IntoIterator<Item = &'a T>) -> Self {
        let mut tags: BTreeMap<String, TagCount> = BTreeMap::new();

        for entry in entries.into_iter().filter(|e| !e.is_draft()) {
            let mut seen = HashSet::new();
            for raw in entry.tags() {
                let name = normalize_tag(raw);
                if name.is_empty() {
                    continue;
                }
                if !is_tag_segment(&name) {
                    warn!(tag = %raw, entry = %entry.slug(), "ignoring tag that is not a valid page name");
                    continue;
                }
                if !seen.insert(name.clone()) {
                    continue;
                }
                tags.entry(name.clone())
                    .or_insert_with(|| TagCount {
                        url: tag_url(&name),
                        display: raw.trim().to_string(),
                        name,
                        count: 0,
                    })
                    .count += 1;
            }
        }

        Self { tags }
    }

    /// Look up a tag by any spelling.
    pub fn get(&self, tag: &str) -> Option<&TagCount> {
        self.tags.get(&normalize_tag(tag))
    }

    pub fn count(&self, tag: &str) -> usize {
        self.get(tag).map_or(0, |t| t.count)
    }

    /// Tags in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TagCount> {
        self.tags.values()
    }

    /// Tags by count descending, then name.
    pub fn sorted_by_count(&self) -> Vec<&TagCount> {
        let mut tags: Vec<&TagCount> = self.tags.values().collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Published entries carrying `tag` (in any spelling), preserving order.
pub fn entries_with_tag<'a, T: Entry + 'a>(
    entries: impl IntoIterator<Item = &'a T>,
    tag: &str,
) -> Vec<&'a T> {
    let wanted = normalize_tag(tag);
    entries
        .into_iter()
        .filter(|e| !e.is_draft())
        .filter(|e| e.tags().iter().any(|t| normalize_tag(t) == wanted))
        .collect()
}
