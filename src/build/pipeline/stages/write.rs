//! Page output stage.

use tracing::debug;

use crate::build::artifact::write_artifact;
use crate::build::paths::url_to_output_path;
use crate::build::pipeline::{PipelineContext, PipelineError, ProcessingDocument, Stage};

/// Writes every rendered page to `<output>/<route>/index.html`.
///
/// Documents that failed an earlier stage produce no page.
pub struct WriteStage;

impl Stage for WriteStage {
    fn name(&self) -> &'static str {
        "write"
    }

    fn process(
        &self,
        docs: &mut [ProcessingDocument],
        ctx: &mut PipelineContext,
    ) -> Result<(), PipelineError> {
        for doc in docs.iter().filter(|d| !d.is_failed()) {
            let Some(page) = doc.output_html.as_deref() else {
                return Err(PipelineError::stage(
                    self.name(),
                    format!("{} reached the write stage unrendered", doc.url_path()),
                ));
            };

            let target = url_to_output_path(doc.url_path(), ctx.output_dir);
            write_artifact(&target, page)?;
            ctx.pages_written += 1;
            debug!(route = %doc.url_path(), path = %target.display(), "page written");
        }

        Ok(())
    }
}
