//! Path, slug and URL conversion utilities.
//!
//! This module handles conversions between:
//! - Content file paths (files inside a collection directory) and slugs
//! - URL paths (the URL at which a page or feed is served)
//! - Output file paths (where files are written in the output directory)
//!
//! It also owns the two normalisers that must stay consistent across the
//! build: heading anchors ([`Slugger`]) and tag URLs ([`normalize_tag`]).

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// File extensions recognised as content.
pub const CONTENT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// Extensions that mark a URL path as a file rather than a page directory.
const FILE_URL_EXTENSIONS: &[&str] = &["html", "xml", "txt", "json"];

#[derive(thiserror::Error, Debug)]
pub enum PathError {
    #[error("{path} is not inside collection root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{0} is not a content file")]
    NotContent(PathBuf),

    #[error("{0} produces an empty slug")]
    EmptySlug(PathBuf),
}

/// Whether a path has one of the content extensions.
pub fn is_content_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| CONTENT_EXTENSIONS.contains(&ext))
}

/// Derive the slug of a content file from its location in the collection.
///
/// # Examples
/// ```ignore
/// slug_from_path("data/blog", "data/blog/hello-world.md", &[]) => "hello-world"
/// slug_from_path("data/blog", "data/blog/guides/Setup.mdx", &[]) => "guides/setup"
/// slug_from_path("data/blog", "data/blog/guides/index.md", &[]) => "guides"
/// slug_from_path("data/blog", "data/blog/post.fr.md", &["fr"]) => "post"
/// slug_from_path("data/blog", "data/blog/fr/post.md", &["fr"]) => "post"
/// ```
pub fn slug_from_path(root: &Path, path: &Path, locales: &[String]) -> Result<String, PathError> {
    let relative = path.strip_prefix(root).map_err(|_| PathError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })?;
    if !is_content_file(relative) {
        return Err(PathError::NotContent(path.to_path_buf()));
    }

    let mut segments: Vec<String> = relative
        .with_extension("")
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();

    // `post.fr.md` -> `post`
    if let Some(last) = segments.last_mut()
        && let Some((stem, suffix)) = last.rsplit_once('.')
        && locales.iter().any(|locale| locale == suffix)
    {
        *last = stem.to_string();
    }

    // `fr/post.md` -> `post`
    if segments.len() > 1 && locales.iter().any(|locale| *locale == segments[0]) {
        segments.remove(0);
    }

    if segments.len() > 1 && segments.last().is_some_and(|last| last == "index") {
        segments.pop();
    }

    let slug = segments
        .iter()
        .map(|segment| segment.trim().to_lowercase().replace(char::is_whitespace, "-"))
        .collect::<Vec<_>>()
        .join("/");

    if slug.is_empty() {
        return Err(PathError::EmptySlug(path.to_path_buf()));
    }
    Ok(slug)
}

/// Convert a URL path to an output file path.
///
/// Pages become `path/index.html`; feed and page files such as
/// `/feed.xml` or `/404.html` keep their path.
///
/// # Examples
/// ```ignore
/// url_to_output_path("/blog/hello", output_dir) => output_dir/blog/hello/index.html
/// url_to_output_path("/", output_dir) => output_dir/index.html
/// url_to_output_path("/tags/rust/feed.xml", output_dir) => output_dir/tags/rust/feed.xml
/// ```
pub fn url_to_output_path(url_path: &str, output_dir: &Path) -> PathBuf {
    let url_path = url_path.trim_matches('/');

    if url_path.is_empty() {
        return output_dir.join("index.html");
    }

    let is_file = Path::new(url_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FILE_URL_EXTENSIONS.contains(&ext));

    if is_file {
        output_dir.join(url_path)
    } else {
        output_dir.join(url_path).join("index.html")
    }
}

/// Get the base path from a config file path (its parent directory).
pub fn base_path_from_config(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Normalise a raw tag into its URL form.
///
/// Trims, lowercases and collapses every run of whitespace, `_`, `-` or `/`
/// into a single `-`. Applying it twice gives the same result.
pub fn normalize_tag(tag: &str) -> String {
    tag.split(|c: char| c.is_whitespace() || matches!(c, '_' | '-' | '/'))
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// URL of the listing page for a tag.
pub fn tag_url(normalized: &str) -> String {
    format!("/tags/{}", urlencoding::encode(normalized))
}

/// Whether a normalised tag can name a directory under `tags/`.
///
/// Dot-only names such as `..` would resolve outside of it.
pub fn is_tag_segment(normalized: &str) -> bool {
    !normalized.is_empty()
        && !normalized.chars().all(|c| c == '.')
        && !normalized.contains(['/', '\\'])
        && !normalized.chars().any(char::is_control)
}

/// Directory holding a tag's listing page and feed.
pub fn tag_output_dir(output_dir: &Path, normalized: &str) -> Option<PathBuf> {
    is_tag_segment(normalized).then(|| output_dir.join("tags").join(normalized))
}

/// Turns heading text into unique anchors.
///
/// Lowercases the text, keeps letters, digits, `-` and `_`, maps each space
/// to `-` and drops everything else. A repeated anchor gets `-1`, `-2`, ...
/// appended, skipping candidates that are already taken.
#[derive(Debug, Default)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug `text` and register the result.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut candidate = base.clone();

        while self.occurrences.contains_key(&candidate) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            candidate = format!("{base}-{count}");
        }

        self.occurrences.insert(candidate.clone(), 0);
        candidate
    }

    /// Register an explicit id so generated anchors never collide with it.
    pub fn reserve(&mut self, id: &str) {
        self.occurrences.entry(id.to_string()).or_insert(0);
    }
}

fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}
