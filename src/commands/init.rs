use std::path::Path;

use anyhow::Context;
use chrono::Local;
use serde_json::json;
use tracing::info;

use crate::{
    InitArgs,
    build::render_front_matter,
    config::{DEFAULT_CONFIG_FILE, RootConfig},
};

/// Minimal settings; every other key is written out with its default.
const STARTER_CONFIG: &str = r#"
site:
  title: My Folio
  author: Your Name
  description: Notes on software and everything around it
  url: https://example.com
"#;

pub async fn run(args: &InitArgs) -> Result<(), anyhow::Error> {
    let path = if args.path.is_relative() {
        std::env::current_dir()?.join(&args.path)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        if args.create {
            tokio::fs::create_dir_all(&path).await?;
            info!("Created directory {}", path.display());
        } else {
            anyhow::bail!("Directory does not exist: {}", path.display());
        }
    }

    let config_file = path.join(DEFAULT_CONFIG_FILE);
    if config_file.exists() {
        anyhow::bail!("{} already exists", config_file.display());
    }

    info!("Initializing project in {}", path.display());

    let config: RootConfig = serde_yaml::from_str(STARTER_CONFIG)?;
    let config_text = serde_yaml::to_string(&config)?;
    tokio::fs::write(&config_file, config_text)
        .await
        .with_context(|| format!("failed to write {}", config_file.display()))?;
    info!("Created config file {}", config_file.display());

    let content = path.join(&config.content.path);
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();

    write_sample(
        &content.join("blog/hello-world.md"),
        json!({
            "title": "Hello, World",
            "date": today,
            "tags": ["welcome", "meta"],
            "summary": "The first post on this site.",
        }),
        "## Getting Started\n\nEdit this file in `data/blog` and run `folio serve`.\n\n## Math\n\nInline math like $e^{i\\pi} + 1 = 0$ is rendered at build time.\n",
    )
    .await?;
    write_sample(
        &content.join("snippets/shell-history.md"),
        json!({
            "title": "Search Shell History",
            "date": today,
            "tags": ["shell"],
            "summary": "Find that command you ran last week.",
        }),
        "```bash\nhistory | grep ssh\n```\n",
    )
    .await?;
    write_sample(
        &content.join("authors/default.md"),
        json!({
            "name": "Your Name",
            "occupation": "Software Engineer",
            "github": "https://github.com",
        }),
        "A few words about yourself.\n",
    )
    .await?;

    Ok(())
}

async fn write_sample(path: &Path, front_matter: serde_json::Value, body: &str) -> Result<(), anyhow::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let text = format!("{}\n{body}", render_front_matter(&front_matter)?);
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Created {}", path.display());
    Ok(())
}
