//! Document types for pipeline processing.

use std::path::PathBuf;

use crate::build::collection::Collection;
use crate::build::document::FrontMatter;
use crate::build::toc::TocEntry;

/// A content file being processed through the pipeline.
///
/// State evolves through the stages:
///
/// 1. Initially: `raw` = file contents, `front_matter` = None
/// 2. After compile: `front_matter`, `html` and `toc` are populated
/// 3. After template: `output_html` = final page HTML
///
/// A document that fails a stage keeps the error in `failure` and is
/// skipped by every later stage.
#[derive(Debug)]
pub struct ProcessingDocument {
    pub collection: Collection,

    /// Path of the content file, for error reporting
    pub source_path: PathBuf,

    /// URL the page is served at, e.g. `/blog/hello`
    pub url_path: String,

    pub slug: String,

    /// File name relative to the collection directory
    pub file_name: String,

    pub raw: String,

    pub front_matter: Option<FrontMatter>,

    /// Compiled body HTML (no page wrapper)
    pub html: String,

    pub toc: Vec<TocEntry>,

    /// Final HTML output after template rendering.
    pub output_html: Option<String>,

    pub failure: Option<String>,
}

impl ProcessingDocument {
    pub fn new(
        collection: Collection,
        source_path: PathBuf,
        url_path: String,
        slug: String,
        file_name: String,
        raw: String,
    ) -> Self {
        Self {
            collection,
            source_path,
            url_path,
            slug,
            file_name,
            raw,
            front_matter: None,
            html: String::new(),
            toc: Vec::new(),
            output_html: None,
            failure: None,
        }
    }

    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Mark the document as failed. Later stages skip it.
    pub fn fail(&mut self, error: impl std::fmt::Display) {
        self.failure = Some(error.to_string());
    }
}
