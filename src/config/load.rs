//! Configuration loading from files.
//!
//! The YAML file is layered with `FOLIO__SECTION__KEY` environment overrides
//! through the `config` crate, then validated.

use std::path::{Path, PathBuf};

use crate::build::Plugin;

use super::{ConfigError, DEFAULT_CONFIG_FILE, RootConfig};

impl RootConfig {
    /// Load the config from the command line argument, defaulting to `folio.yaml`
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_file = config_file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        let config = Self::load_from_file(&config_file)?;
        Ok((config, config_file))
    }

    /// Load the config from a file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| ConfigError::EncodePath(path.to_path_buf()))?;

        let config: RootConfig = config::Config::builder()
            .add_source(config::File::new(path_str, config::FileFormat::Yaml))
            .add_source(
                config::Environment::with_prefix("FOLIO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.site.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "site.url must be an absolute http(s) URL, got '{}'",
                self.site.url
            )));
        }
        if self.site.posts_per_page == 0 {
            return Err(ConfigError::Validation(
                "site.posts_per_page must be at least 1".to_string(),
            ));
        }
        for name in &self.markdown.plugins {
            name.parse::<Plugin>()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        Ok(())
    }

    /// Site URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.site.url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("folio.yaml");
        fs::write(&path, body).unwrap();
        path
    }

    const MINIMAL: &str = r#"
site:
  title: My Blog
  author: Jane Doe
  url: https://example.com/
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), MINIMAL);

        let config = RootConfig::load_from_file(&path).unwrap();
        assert_eq!(config.site.title, "My Blog");
        assert_eq!(config.site.posts_per_page, 6);
        assert_eq!(config.site.output, PathBuf::from("_site"));
        assert_eq!(config.content.path, PathBuf::from("data"));
        assert_eq!(config.markdown.plugins.len(), 7);
        assert!(config.feed.enable);
        assert_eq!(config.feed.path, "feed.xml");
        assert_eq!(config.sitemap.path, "sitemap.xml");
        assert!(config.episodes.is_none());
        assert_eq!(config.dev.watch.debounce_ms, 100);
        assert_eq!(config.base_url(), "https://example.com");
    }

    #[test]
    fn test_sections_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
site:
  title: My Blog
  author: Jane Doe
  url: https://example.com
  posts_per_page: 10
  locales: [en, fr]
markdown:
  plugins: [slug, gfm]
feed:
  tag_feeds: false
episodes:
  endpoint: https://api.example.com/shows/1/episodes
"#,
        );

        let config = RootConfig::load_from_file(&path).unwrap();
        assert_eq!(config.site.posts_per_page, 10);
        assert_eq!(config.site.locales, vec!["en", "fr"]);
        assert_eq!(config.markdown.plugins, vec!["slug", "gfm"]);
        assert!(!config.feed.tag_feeds);
        let episodes = config.episodes.unwrap();
        assert_eq!(episodes.limit, 6);
        assert!(episodes.token_env.is_none());
    }

    #[test]
    fn test_unknown_plugin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            &format!("{MINIMAL}markdown:\n  plugins: [gfm, mermaid]\n"),
        );

        let err = RootConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("mermaid"));
    }

    #[test]
    fn test_relative_site_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "site:\n  title: t\n  author: a\n  url: example.com\n",
        );

        let err = RootConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_site_section_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "content:\n  path: posts\n");

        let err = RootConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Deserialize(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RootConfig::load_from_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
