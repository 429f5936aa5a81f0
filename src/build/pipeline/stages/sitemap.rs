//! Sitemap stage.

use tracing::info;

use crate::build::artifact::write_artifact;
use crate::build::pipeline::{DEFAULT_AUTHOR, FinalizeStage, PipelineContext, PipelineError};
use crate::build::sitemap::{ROUTES, Sitemap};

/// Writes `sitemap.xml` from the static routes, published posts and
/// snippets, and tag pages. `/about` and `/projects` are only listed when
/// those pages are built.
pub struct SitemapStage;

impl FinalizeStage for SitemapStage {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn finalize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let config = &ctx.config.sitemap;
        if !config.enable {
            return Ok(());
        }

        let collections = &ctx.collections;
        let has_about = collections.authors.get(DEFAULT_AUTHOR).is_ok();
        let has_projects = !ctx.config.projects.is_empty();
        let routes = ROUTES.iter().copied().filter(|route| match *route {
            "/about" => has_about,
            "/projects" => has_projects,
            _ => true,
        });
        let mut sitemap = Sitemap::from_routes(&ctx.config.site.url, routes);
        sitemap.add_entries(collections.posts.entries());
        sitemap.add_entries(collections.snippets.entries());
        sitemap.add_tags(&collections.tags);

        let count = sitemap.len();
        write_artifact(
            &ctx.output_dir.join(config.path.trim_start_matches('/')),
            sitemap.into_xml(),
        )?;
        info!(path = %config.path, urls = count, "wrote sitemap");
        Ok(())
    }
}
