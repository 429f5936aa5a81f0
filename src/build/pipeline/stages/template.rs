//! Page template rendering stage.
//!
//! Wraps compiled HTML in the layout selected by the document's front
//! matter, adding site chrome, SEO metadata and navigation.

use crate::build::collection::CollectionIndex;
use crate::build::document::{Entry, FrontMatter};
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};
use crate::build::render::{
    ArticlePage, AuthorPage, EntrySummary, PLACEHOLDER_TEMPLATE, PageLink, PlainPage, discuss_url,
    edit_url,
};
use crate::build::seo::PageSeo;

/// Stage that applies the layout template to compiled content.
///
/// Drafts get the placeholder page instead of their body. After this
/// stage, `doc.output_html` contains the complete HTML page.
pub struct TemplateStage;

impl Stage for TemplateStage {
    fn name(&self) -> &'static str {
        "template"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs.iter_mut().filter(|d| !d.is_failed()) {
            let Some(front_matter) = &doc.front_matter else {
                return Err(PipelineError::stage(
                    "template",
                    format!(
                        "document '{}' has no front matter (was compile stage run?)",
                        doc.url_path()
                    ),
                ));
            };

            let html = if front_matter.is_draft() {
                render_placeholder(ctx, front_matter, doc.url_path())?
            } else {
                match front_matter {
                    FrontMatter::Post(post) => {
                        render_article(ctx, doc, front_matter, post, &ctx.collections.posts)?
                    }
                    FrontMatter::Snippet(snippet) => {
                        render_article(ctx, doc, front_matter, snippet, &ctx.collections.snippets)?
                    }
                    FrontMatter::Author(author) => {
                        let page = AuthorPage {
                            site: ctx.site,
                            seo: PageSeo::website(
                                &ctx.config.site,
                                ctx.feed_path(),
                                &format!("About - {}", author.name),
                                &ctx.config.site.description,
                                doc.url_path(),
                            ),
                            author,
                            content: &doc.html,
                        };
                        ctx.renderer.render_layout(author.layout(), &page)?
                    }
                }
            };

            doc.output_html = Some(html);
        }

        Ok(())
    }
}

fn render_placeholder(
    ctx: &PipelineContext,
    front_matter: &FrontMatter,
    url_path: &str,
) -> Result<String, PipelineError> {
    let page = PlainPage {
        site: ctx.site,
        seo: PageSeo::website(
            &ctx.config.site,
            ctx.feed_path(),
            &format!("{} - {}", front_matter.title(), ctx.config.site.title),
            &ctx.config.site.description,
            url_path,
        ),
        title: front_matter.title().to_string(),
    };
    Ok(ctx.renderer.render(PLACEHOLDER_TEMPLATE, &page)?)
}

fn render_article<T: Entry>(
    ctx: &PipelineContext,
    doc: &ProcessingDocument,
    front_matter: &FrontMatter,
    entry: &T,
    index: &CollectionIndex<T>,
) -> Result<String, PipelineError> {
    let authors = ctx.authors_for(entry.authors());
    // An entry that failed to index has no neighbours.
    let (prev, next) = match index.neighbors(entry.slug()) {
        Ok(neighbors) => (
            neighbors.prev.map(PageLink::to_entry),
            neighbors.next.map(PageLink::to_entry),
        ),
        Err(_) => (None, None),
    };

    let page = ArticlePage {
        site: ctx.site,
        seo: PageSeo::article(&ctx.config.site, ctx.feed_path(), entry, &authors),
        entry: EntrySummary::from_entry(entry),
        front_matter,
        content: &doc.html,
        toc: &doc.toc,
        authors,
        prev,
        next,
        edit_url: edit_url(ctx.config, T::COLLECTION, entry.file_name()),
        discuss_url: discuss_url(ctx.config, doc.url_path()),
    };
    Ok(ctx.renderer.render_layout(entry.layout(), &page)?)
}
