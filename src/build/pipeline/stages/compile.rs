//! Content compilation stage.
//!
//! Parses front matter and renders the markdown body of every document
//! through the configured plugin chain.

use tracing::{debug, warn};

use crate::build::collection::Collection;
use crate::build::compiler::{CompileError, compile_document};
use crate::build::document::{
    AuthorFrontMatter, Entry, FrontMatter, PostFrontMatter, SnippetFrontMatter,
};
use crate::build::markdown::MarkdownContext;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Stage that compiles raw content files to HTML.
///
/// After this stage, `doc.front_matter`, `doc.html` and `doc.toc` are set.
/// A document whose front matter or body fails to compile is marked as
/// failed and taken out of the collection indexes; the rest of the build
/// carries on.
pub struct CompileStage;

impl Stage for CompileStage {
    fn name(&self) -> &'static str {
        "compile"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs.iter_mut().filter(|d| !d.is_failed()) {
            let result = match doc.collection {
                Collection::Posts => compile::<PostFrontMatter>(doc, &ctx.markdown),
                Collection::Snippets => compile::<SnippetFrontMatter>(doc, &ctx.markdown),
                Collection::Authors => compile::<AuthorFrontMatter>(doc, &ctx.markdown),
            };

            match result {
                Ok(()) => debug!(url = %doc.url_path, "compiled"),
                Err(error) => {
                    warn!(path = %doc.source_path.display(), %error, "failed to compile document");
                    doc.fail(error);
                }
            }
        }

        ctx.collections.remove_failed(docs);
        Ok(())
    }
}

fn compile<T>(doc: &mut ProcessingDocument, ctx: &MarkdownContext<'_>) -> Result<(), CompileError>
where
    T: Entry + Into<FrontMatter>,
{
    let compiled = compile_document::<T>(&doc.raw, &doc.slug, &doc.file_name, ctx)?;
    doc.front_matter = Some(compiled.front_matter.into());
    doc.html = compiled.html;
    doc.toc = compiled.toc;
    Ok(())
}
