//! Pipeline error types.

use crate::build::artifact::ArtifactError;
use crate::build::feed::FeedError;
use crate::build::render::RenderError;

/// Errors that abort a pipeline run.
///
/// Failures of a single document never surface here; they are recorded on
/// the document and reported by the builder.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("template rendering error: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("feed generation error: {0}")]
    Feed(#[from] FeedError),

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl PipelineError {
    /// Create a stage-specific error.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
