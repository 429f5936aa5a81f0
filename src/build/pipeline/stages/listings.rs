//! Listing pages built from the collection indexes.
//!
//! The home page, the paginated blog, the snippet index, the tag pages, the
//! projects page and the 404 page are rendered once per build, after every
//! document is written.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::build::artifact::write_artifact;
use crate::build::document::Entry;
use crate::build::paths::{tag_output_dir, url_to_output_path};
use crate::build::pipeline::{FinalizeStage, PipelineContext, PipelineError};
use crate::build::render::{
    EntrySummary, HomePage, INDEX_TEMPLATE, Layout, ListPage, NOT_FOUND_TEMPLATE, PROJECTS_TEMPLATE,
    Pagination, PlainPage, ProjectsPage, TAGS_TEMPLATE, TagsPage, page_url,
};
use crate::build::seo::PageSeo;
use crate::build::tags::entries_with_tag;

/// Entries of each kind shown on the home page.
const HOME_ENTRIES: usize = 5;

/// Path of the stylesheet for highlighted code.
pub const HIGHLIGHT_CSS_PATH: &str = "/static/highlight.css";

pub struct ListingsStage;

/// A rendered listing and the file it goes to.
struct Listing {
    path: PathBuf,
    html: String,
}

impl Listing {
    fn at_url(ctx: &PipelineContext, url: &str, html: String) -> Self {
        Self {
            path: url_to_output_path(url, ctx.output_dir),
            html,
        }
    }
}

impl FinalizeStage for ListingsStage {
    fn name(&self) -> &'static str {
        "listings"
    }

    fn finalize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let mut listings = Vec::new();
        render_home(ctx, &mut listings)?;
        render_blog(ctx, &mut listings)?;
        render_snippets(ctx, &mut listings)?;
        render_tags(ctx, &mut listings)?;
        render_projects(ctx, &mut listings)?;
        render_not_found(ctx, &mut listings)?;

        for listing in listings {
            write_artifact(&listing.path, listing.html)?;
            ctx.pages_written += 1;
            debug!(path = %listing.path.display(), "wrote listing");
        }

        if let Some(css) = ctx.highlight_css {
            let path = ctx.output_dir.join(HIGHLIGHT_CSS_PATH.trim_start_matches('/'));
            write_artifact(&path, css)?;
        }

        Ok(())
    }
}

fn seo(ctx: &PipelineContext, title: &str, path: &str) -> PageSeo {
    let site = &ctx.config.site;
    PageSeo::website(site, ctx.feed_path(), title, &site.description, path)
}

fn summaries<'e, T: Entry + 'e>(entries: impl IntoIterator<Item = &'e T>) -> Vec<EntrySummary> {
    entries.into_iter().map(EntrySummary::from_entry).collect()
}

fn render_home(ctx: &PipelineContext, out: &mut Vec<Listing>) -> Result<(), PipelineError> {
    let collections = &ctx.collections;
    let page = HomePage {
        site: ctx.site,
        seo: seo(ctx, &ctx.config.site.title, "/"),
        posts: summaries(collections.posts.published().take(HOME_ENTRIES)),
        snippets: summaries(collections.snippets.published().take(HOME_ENTRIES)),
        episodes: ctx.episodes,
    };
    let html = ctx.renderer.render(INDEX_TEMPLATE, &page)?;
    out.push(Listing::at_url(ctx, "/", html));
    Ok(())
}

/// `/blog` plus `/blog/page/{n}` for every further page.
fn render_blog(ctx: &PipelineContext, out: &mut Vec<Listing>) -> Result<(), PipelineError> {
    let posts: Vec<_> = ctx.collections.posts.published().collect();
    let per_page = ctx.config.site.posts_per_page;
    let total = Pagination::page_count(posts.len(), per_page);
    let title = format!("Blog - {}", ctx.config.site.author);

    for (i, chunk) in posts
        .chunks(per_page.max(1))
        .chain(posts.is_empty().then_some(&[][..]))
        .enumerate()
    {
        let current = i + 1;
        let url = if current == 1 {
            "/blog".to_string()
        } else {
            page_url("/blog", current)
        };
        let page = ListPage {
            site: ctx.site,
            seo: seo(ctx, &title, &url),
            title: "All Posts".to_string(),
            entries: summaries(chunk.iter().copied()),
            pagination: Some(Pagination::new("/blog", current, total)),
        };
        let html = ctx.renderer.render_layout(Layout::ListLayout, &page)?;
        out.push(Listing::at_url(ctx, &url, html));
    }

    Ok(())
}

fn render_snippets(ctx: &PipelineContext, out: &mut Vec<Listing>) -> Result<(), PipelineError> {
    let title = format!("Snippets - {}", ctx.config.site.author);
    let page = ListPage {
        site: ctx.site,
        seo: seo(ctx, &title, "/snippets"),
        title: "Snippets".to_string(),
        entries: summaries(ctx.collections.snippets.published()),
        pagination: None,
    };
    let html = ctx.renderer.render_layout(Layout::ListLayout, &page)?;
    out.push(Listing::at_url(ctx, "/snippets", html));
    Ok(())
}

/// `/tags` and one listing per tag.
fn render_tags(ctx: &PipelineContext, out: &mut Vec<Listing>) -> Result<(), PipelineError> {
    let collections = &ctx.collections;
    let title = format!("Tags - {}", ctx.config.site.author);
    let page = TagsPage {
        site: ctx.site,
        seo: seo(ctx, &title, "/tags"),
        tags: collections.tags.sorted_by_count(),
    };
    let html = ctx.renderer.render(TAGS_TEMPLATE, &page)?;
    out.push(Listing::at_url(ctx, "/tags", html));

    for tag in collections.tags.iter() {
        let Some(dir) = tag_output_dir(ctx.output_dir, &tag.name) else {
            warn!(tag = %tag.name, "skipping tag page outside of tags/");
            continue;
        };
        let posts = entries_with_tag(collections.posts.entries(), &tag.name);
        let page = ListPage {
            site: ctx.site,
            seo: seo(ctx, &format!("{} - {}", tag.display, ctx.config.site.title), &tag.url),
            title: tag.display.clone(),
            entries: summaries(posts),
            pagination: None,
        };
        let html = ctx.renderer.render_layout(Layout::ListLayout, &page)?;
        out.push(Listing {
            path: dir.join("index.html"),
            html,
        });
    }

    Ok(())
}

/// `/projects`, only when the config lists any.
fn render_projects(ctx: &PipelineContext, out: &mut Vec<Listing>) -> Result<(), PipelineError> {
    let projects = &ctx.config.projects;
    if projects.is_empty() {
        return Ok(());
    }

    let title = format!("Projects - {}", ctx.config.site.author);
    let page = ProjectsPage {
        site: ctx.site,
        seo: seo(ctx, &title, "/projects"),
        projects,
    };
    let html = ctx.renderer.render(PROJECTS_TEMPLATE, &page)?;
    out.push(Listing::at_url(ctx, "/projects", html));
    Ok(())
}

fn render_not_found(ctx: &PipelineContext, out: &mut Vec<Listing>) -> Result<(), PipelineError> {
    let page = PlainPage {
        site: ctx.site,
        seo: seo(ctx, &format!("Page Not Found - {}", ctx.config.site.title), "/404"),
        title: "Page Not Found".to_string(),
    };
    let html = ctx.renderer.render(NOT_FOUND_TEMPLATE, &page)?;
    out.push(Listing::at_url(ctx, "/404.html", html));
    Ok(())
}
