//! Whole-document compilation: front matter plus rendered body.

use super::document::{Entry, FrontMatterError, parse_front_matter};
use super::markdown::{MarkdownContext, MarkdownError, render_markdown};
use super::toc::TocEntry;

#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

/// A compiled content file. Rebuilt on every build.
#[derive(Debug, Clone)]
pub struct CompiledDocument<T> {
    pub html: String,
    pub front_matter: T,
    pub toc: Vec<TocEntry>,
}

/// Compile a raw content file into HTML with its front matter and TOC.
///
/// `slug` and `file_name` identify the file and are attached to the front
/// matter; they never come from the YAML block.
pub fn compile_document<T: Entry>(
    raw: &str,
    slug: &str,
    file_name: &str,
    ctx: &MarkdownContext<'_>,
) -> Result<CompiledDocument<T>, CompileError> {
    let parsed = parse_front_matter::<T>(raw)?;
    let mut front_matter = parsed.front_matter;
    front_matter.set_origin(slug.to_string(), file_name.to_string());

    let output = render_markdown(&parsed.body, ctx)?;

    Ok(CompiledDocument {
        html: output.html,
        front_matter,
        toc: output.toc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::PostFrontMatter;
    use crate::build::highlight::SyntaxHighlighter;
    use crate::build::markdown::MarkdownOptions;
    use crate::config::MarkdownConfig;

    fn compile(raw: &str) -> Result<CompiledDocument<PostFrontMatter>, CompileError> {
        let options = MarkdownOptions::from_config(&MarkdownConfig {
            plugins: vec!["slug".to_string(), "math".to_string()],
            ..MarkdownConfig::default()
        })
        .unwrap();
        let highlighter = SyntaxHighlighter::default();
        let ctx = MarkdownContext {
            options: &options,
            highlighter: &highlighter,
            bibliography: None,
        };
        compile_document(raw, "hello", "hello.md", &ctx)
    }

    #[test]
    fn test_compile_document() {
        let doc = compile("---\ntitle: Hello\ndate: 2023-03-01\n---\n\n## Setup\n\n## Setup\n").unwrap();
        assert_eq!(doc.front_matter.title, "Hello");
        assert_eq!(doc.front_matter.slug, "hello");
        assert_eq!(doc.front_matter.file_name, "hello.md");
        assert_eq!(doc.toc.len(), 2);
        assert_eq!(doc.toc[1].anchor, "setup-1");
        assert!(doc.html.contains("id=\"setup-1\""));
    }

    #[test]
    fn test_front_matter_error_propagates() {
        let err = compile("## No front matter\n").unwrap_err();
        assert!(matches!(err, CompileError::FrontMatter(FrontMatterError::Missing)));
    }

    #[test]
    fn test_plugin_error_propagates() {
        let err = compile("---\ntitle: t\ndate: 2023-03-01\n---\n$\\notacommand$\n").unwrap_err();
        assert!(matches!(err, CompileError::Markdown(MarkdownError::Math { .. })));
    }
}
