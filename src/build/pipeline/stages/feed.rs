//! RSS feed stage.

use tracing::{debug, info};

use crate::build::artifact::write_artifact;
use crate::build::feed::FeedBuilder;
use crate::build::paths::tag_output_dir;
use crate::build::pipeline::{FinalizeStage, PipelineContext, PipelineError};
use crate::build::tags::entries_with_tag;

/// Writes the site feed and, when enabled, `tags/<tag>/feed.xml` for every
/// tag with published posts.
pub struct FeedStage;

impl FinalizeStage for FeedStage {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn finalize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let config = &ctx.config.feed;
        if !config.enable {
            return Ok(());
        }

        let builder = FeedBuilder::new(&ctx.config.site);
        let posts = &ctx.collections.posts;

        let xml = builder.render(posts.entries())?;
        write_artifact(&ctx.output_dir.join(config.path.trim_start_matches('/')), xml)?;
        info!(path = %config.path, "wrote feed");

        if config.tag_feeds {
            for tag in ctx.collections.tags.iter() {
                let Some(dir) = tag_output_dir(ctx.output_dir, &tag.name) else {
                    continue;
                };
                let tagged = entries_with_tag(posts.entries(), &tag.name);
                let xml = builder.render_tag(tag, tagged)?;
                write_artifact(&dir.join("feed.xml"), xml)?;
                debug!(tag = %tag.name, "wrote tag feed");
            }
        }

        Ok(())
    }
}
