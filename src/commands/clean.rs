use anyhow::Context;
use tracing::info;

use crate::{CleanArgs, build::base_path_from_config, config::RootConfig};

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = RootConfig::load_from_arg(args.config_file.as_deref())
        .context("failed to load config")?;

    // Get the base path for resolving relative paths
    let base_path = base_path_from_config(&config_path);

    // Delete the generated site folder
    let site_path = base_path.join(&config.site.output);
    let site_path = site_path.canonicalize().unwrap_or(site_path);

    if site_path == base_path.canonicalize().unwrap_or(base_path) {
        anyhow::bail!(
            "refusing to delete {}: site.output points at the project root",
            site_path.display()
        );
    }

    if !site_path.exists() {
        info!("Nothing to clean at {}", site_path.display());
        return Ok(());
    }

    if args.dry_run {
        info!("Would delete {}", site_path.display());
    } else {
        tokio::fs::remove_dir_all(&site_path)
            .await
            .with_context(|| format!("failed to delete {}", site_path.display()))?;
        info!("Deleted {}", site_path.display());
    }

    Ok(())
}
