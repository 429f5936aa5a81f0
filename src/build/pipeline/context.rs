//! Pipeline context for sharing state across stages.

use std::path::Path;

use tracing::debug;

use crate::build::collection::{Collection, CollectionIndex};
use crate::build::document::{AuthorFrontMatter, PostFrontMatter, SnippetFrontMatter};
use crate::build::episodes::Episode;
use crate::build::pipeline::ProcessingDocument;
use crate::build::markdown::MarkdownContext;
use crate::build::render::{Renderer, SiteContext};
use crate::build::tags::TagIndex;
use crate::config::RootConfig;

/// The collections of one build, sorted and indexed.
pub struct Collections {
    pub posts: CollectionIndex<PostFrontMatter>,
    pub snippets: CollectionIndex<SnippetFrontMatter>,
    pub authors: CollectionIndex<AuthorFrontMatter>,
    /// Tags of published posts
    pub tags: TagIndex,
}

impl Collections {
    pub fn new(
        posts: CollectionIndex<PostFrontMatter>,
        snippets: CollectionIndex<SnippetFrontMatter>,
        authors: CollectionIndex<AuthorFrontMatter>,
    ) -> Self {
        let tags = TagIndex::from_entries(posts.entries());
        Self {
            posts,
            snippets,
            authors,
            tags,
        }
    }

    /// Drop the entries of failed documents and recount tags, so listings,
    /// feeds, the sitemap and neighbour links only name pages that exist.
    pub fn remove_failed(&mut self, docs: &[ProcessingDocument]) {
        let mut removed = 0;
        for doc in docs.iter().filter(|d| d.is_failed()) {
            let found = match doc.collection {
                Collection::Posts => self.posts.remove(&doc.slug).is_some(),
                Collection::Snippets => self.snippets.remove(&doc.slug).is_some(),
                Collection::Authors => self.authors.remove(&doc.slug).is_some(),
            };
            if found {
                removed += 1;
            }
        }

        if removed > 0 {
            self.tags = TagIndex::from_entries(self.posts.entries());
            debug!(removed, "dropped failed documents from the indexes");
        }
    }
}

/// Shared context for pipeline stages.
///
/// Contains all resources and configuration needed by stages during processing.
pub struct PipelineContext<'a> {
    pub config: &'a RootConfig,

    /// Directory where output files are written
    pub output_dir: &'a Path,

    /// Site metadata passed to every template
    pub site: &'a SiteContext,

    pub renderer: &'a Renderer,

    /// Plugins, highlighter and bibliography for the content compiler
    pub markdown: MarkdownContext<'a>,

    /// Indexes of the build, without documents that failed to compile
    pub collections: Collections,

    /// Podcast episodes for the home page, empty when not configured
    pub episodes: &'a [Episode],

    /// Stylesheet for highlighted code, written by the listings stage
    pub highlight_css: Option<&'a str>,

    /// Number of HTML pages written so far
    pub pages_written: usize,
}

impl PipelineContext<'_> {
    pub fn feed_path(&self) -> &str {
        &self.config.feed.path
    }

    /// Authors of an entry, falling back to the `default` author.
    /// Unknown author slugs are skipped.
    pub fn authors_for(&self, slugs: Option<&[String]>) -> Vec<&AuthorFrontMatter> {
        let authors = &self.collections.authors;
        match slugs {
            Some(slugs) => slugs
                .iter()
                .filter_map(|slug| authors.get(slug).ok())
                .collect(),
            None => authors.get(DEFAULT_AUTHOR).ok().into_iter().collect(),
        }
    }
}

/// Author slug used when an entry names no authors, and for `/about`.
pub const DEFAULT_AUTHOR: &str = "default";
