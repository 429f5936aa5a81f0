use anyhow::Context;
use tracing::{info, warn};

use crate::{
    BuildArgs,
    build::{Builder, base_path_from_config},
    config::RootConfig,
};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = RootConfig::load_from_arg(args.config_file.as_deref())
        .context("failed to load config")?;

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    let builder = Builder::new(config, base_path);
    let result = builder.build().await.context("build failed")?;

    info!(
        "Built site to {} ({} documents, {} pages, {} static files)",
        result.output_dir.display(),
        result.documents,
        result.pages,
        result.static_files
    );

    if !result.failures.is_empty() {
        warn!(
            "{} document(s) were skipped, see the warnings above",
            result.failures.len()
        );
    }

    Ok(())
}
