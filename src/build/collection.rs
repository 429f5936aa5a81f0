//! Collection indexing: enumerate, parse, sort and look up content files.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::document::{Entry, FrontMatterError, parse_front_matter};
use super::paths::{PathError, is_content_file, slug_from_path};

/// The content collections of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Posts,
    Snippets,
    Authors,
}

impl Collection {
    /// Directory name under the content root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Collection::Posts => "blog",
            Collection::Snippets => "snippets",
            Collection::Authors => "authors",
        }
    }

    /// URL prefix of the pages rendered from this collection.
    pub fn url_prefix(self) -> &'static str {
        match self {
            Collection::Posts => "/blog",
            Collection::Snippets => "/snippets",
            Collection::Authors => "/authors",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum CollectionError {
    #[error("collection directory does not exist: {0}")]
    MissingDirectory(PathBuf),

    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no {collection} entry with slug '{slug}'")]
    MissingSlug { collection: Collection, slug: String },
}

/// Why a single content file was left out of its collection.
#[derive(thiserror::Error, Debug)]
pub enum EntryError {
    #[error("failed to read: {0}")]
    Read(std::io::Error),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error("slug '{slug}' is already used by {existing}")]
    DuplicateSlug { slug: String, existing: String },
}

/// A content file that failed to load, isolated from the rest.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub error: EntryError,
}

// =============================================================================
// Index
// =============================================================================

/// Previous (older) and next (newer) published neighbours of an entry.
#[derive(Debug)]
pub struct Neighbors<'a, T> {
    pub prev: Option<&'a T>,
    pub next: Option<&'a T>,
}

/// All entries of one collection, newest first.
///
/// Drafts stay in the index so they can be looked up directly; listings,
/// feeds, tags and the sitemap use [`CollectionIndex::published`].
#[derive(Debug)]
pub struct CollectionIndex<T> {
    root: PathBuf,
    entries: Vec<T>,
    failures: Vec<LoadFailure>,
}

impl<T: Entry> CollectionIndex<T> {
    /// Enumerate and parse the collection directory under `content_root`.
    ///
    /// Files are visited in sorted path order, then stably sorted by date,
    /// so entries with equal dates keep their path order.
    pub fn load(content_root: &Path, locales: &[String]) -> Result<Self, CollectionError> {
        let root = content_root.join(T::COLLECTION.dir_name());
        if !root.is_dir() {
            return Err(CollectionError::MissingDirectory(root));
        }

        let mut files = Vec::new();
        walk_directory(&root, &mut files)?;

        let mut entries: Vec<T> = Vec::new();
        let mut failures = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for path in files {
            match load_entry::<T>(&root, &path, locales) {
                Ok(entry) if seen.contains(entry.slug()) => {
                    let existing = entries
                        .iter()
                        .find(|e| e.slug() == entry.slug())
                        .map(|e| e.file_name().to_string())
                        .unwrap_or_default();
                    let error = EntryError::DuplicateSlug {
                        slug: entry.slug().to_string(),
                        existing,
                    };
                    warn!(path = %path.display(), %error, "skipping content file");
                    failures.push(LoadFailure { path, error });
                }
                Ok(entry) => {
                    seen.insert(entry.slug().to_string());
                    entries.push(entry);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping content file");
                    failures.push(LoadFailure { path, error });
                }
            }
        }

        debug!(
            collection = %T::COLLECTION,
            entries = entries.len(),
            failures = failures.len(),
            "loaded collection"
        );

        // `sort_by` is stable
        entries.sort_by(|a, b| b.date().cmp(&a.date()));
        Ok(Self {
            root,
            entries,
            failures,
        })
    }

    /// Every entry, drafts included, newest first.
    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    /// Entries that are not drafts, newest first.
    pub fn published(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().filter(|e| !e.is_draft())
    }

    /// Look up an entry by slug, drafts included.
    pub fn get(&self, slug: &str) -> Result<&T, CollectionError> {
        self.entries
            .iter()
            .find(|e| e.slug() == slug)
            .ok_or_else(|| CollectionError::MissingSlug {
                collection: T::COLLECTION,
                slug: slug.to_string(),
            })
    }

    /// Published neighbours of `slug`. Drafts have none.
    pub fn neighbors(&self, slug: &str) -> Result<Neighbors<'_, T>, CollectionError> {
        self.get(slug)?;
        let published: Vec<&T> = self.published().collect();
        let Some(idx) = published.iter().position(|e| e.slug() == slug) else {
            return Ok(Neighbors {
                prev: None,
                next: None,
            });
        };
        Ok(Neighbors {
            prev: published.get(idx + 1).copied(),
            next: idx.checked_sub(1).and_then(|i| published.get(i).copied()),
        })
    }

    /// Take an entry out of the index, keeping the order of the rest.
    pub fn remove(&mut self, slug: &str) -> Option<T> {
        let idx = self.entries.iter().position(|e| e.slug() == slug)?;
        Some(self.entries.remove(idx))
    }

    /// Source file of an entry.
    pub fn source_path(&self, entry: &T) -> PathBuf {
        self.root.join(entry.file_name())
    }

    pub fn failures(&self) -> &[LoadFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn load_entry<T: Entry>(root: &Path, path: &Path, locales: &[String]) -> Result<T, EntryError> {
    let slug = slug_from_path(root, path, locales)?;
    let raw = std::fs::read_to_string(path).map_err(EntryError::Read)?;
    let mut entry = parse_front_matter::<T>(&raw)?.front_matter;

    let file_name = path
        .strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");
    entry.set_origin(slug, file_name);
    Ok(entry)
}

/// Collect content files below `dir` in sorted path order.
fn walk_directory(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), CollectionError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| CollectionError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut paths = read_dir
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CollectionError::ReadDir {
            path: dir.to_path_buf(),
            source: e,
        })?;
    paths.sort();

    for path in paths {
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }

        if path.is_dir() {
            walk_directory(&path, files)?;
        } else if path.is_file() && is_content_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}
