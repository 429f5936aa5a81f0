//! Configuration type definitions.
//!
//! This module contains all the data structures used in `folio.yaml`.
//! These types are pure data - no I/O or complex logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// =============================================================================
// Root config
// =============================================================================

/// Site configuration, deserialized from `folio.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootConfig {
    pub site: SiteConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub markdown: MarkdownConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub sitemap: SitemapConfig,
    /// Cards on the `/projects` page; the page is only built when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub projects: Vec<ProjectConfig>,
    /// Podcast episode list shown on the home page (disabled if omitted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<EpisodesConfig>,
    /// Development-specific settings (watch mode, etc.)
    #[serde(default)]
    pub dev: DevConfig,
}

// =============================================================================
// Site configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// Absolute base URL, used for feeds, the sitemap and canonical links
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Locale advertised to social cards as `og:locale`
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    /// Repository URL for "View on GitHub" links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    /// Branch the "View on GitHub" links point at
    #[serde(default = "default_repository_branch")]
    pub repository_branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Default image for social cards (site-relative)
    #[serde(default = "default_social_banner")]
    pub social_banner: String,
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default = "default_posts_per_page")]
    pub posts_per_page: usize,
    /// Locale codes stripped from content paths when deriving slugs
    #[serde(default)]
    pub locales: Vec<String>,
    /// Header navigation links
    #[serde(default = "default_nav")]
    pub nav: Vec<NavLink>,
}

fn default_language() -> String {
    "en-us".to_string()
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_repository_branch() -> String {
    "master".to_string()
}

fn default_social_banner() -> String {
    "/static/images/twitter-card.png".to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("_site")
}

fn default_posts_per_page() -> usize {
    6
}

fn default_nav() -> Vec<NavLink> {
    [
        ("Blog", "/blog"),
        ("Snippets", "/snippets"),
        ("Tags", "/tags"),
        ("About", "/about"),
    ]
    .into_iter()
    .map(|(title, url)| NavLink {
        title: title.to_string(),
        url: url.to_string(),
    })
    .collect()
}

/// A single header navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub title: String,
    pub url: String,
}

/// A project card on the `/projects` page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Hero image, 16:9
    #[serde(default, alias = "imgSrc", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

// =============================================================================
// Content configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Directory holding the `blog`, `snippets` and `authors` collections
    #[serde(default = "default_content_path")]
    pub path: PathBuf,
}

fn default_content_path() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: default_content_path(),
        }
    }
}

// =============================================================================
// Markdown configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Parser extensions to enable for markdown processing
    #[serde(default = "default_markdown_extensions")]
    pub extensions: Vec<String>,
    /// Transform plugins; applied in a fixed order regardless of listing order
    #[serde(default = "default_markdown_plugins")]
    pub plugins: Vec<String>,
    /// YAML bibliography used to resolve `[@key]` citations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<PathBuf>,
    /// Syntax highlighting theme
    #[serde(default = "default_highlight_theme")]
    pub highlight_theme: String,
}

fn default_markdown_extensions() -> Vec<String> {
    vec![
        "footnotes".to_string(),
        "heading_attributes".to_string(),
        "strikethrough".to_string(),
        "tables".to_string(),
        "tasklists".to_string(),
    ]
}

fn default_markdown_plugins() -> Vec<String> {
    vec![
        "gfm".to_string(),
        "math".to_string(),
        "citation".to_string(),
        "highlight".to_string(),
        "slug".to_string(),
        "autolink_headings".to_string(),
        "minify".to_string(),
    ]
}

fn default_highlight_theme() -> String {
    "github-dark".to_string()
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            extensions: default_markdown_extensions(),
            plugins: default_markdown_plugins(),
            bibliography: None,
            highlight_theme: default_highlight_theme(),
        }
    }
}

// =============================================================================
// Theme configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Theme directory with a `templates/` folder; the embedded theme is used if unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Arbitrary settings passed to templates as `theme.*`
    #[serde(default)]
    pub settings: serde_json::Value,
}

// =============================================================================
// Feed and sitemap configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    /// Output path of the main feed, relative to the output directory
    #[serde(default = "default_feed_path")]
    pub path: String,
    /// Also write `tags/<tag>/feed.xml` for every tag with published posts
    #[serde(default = "default_true")]
    pub tag_feeds: bool,
}

fn default_feed_path() -> String {
    "feed.xml".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: default_feed_path(),
            tag_feeds: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    #[serde(default = "default_true")]
    pub enable: bool,
    #[serde(default = "default_sitemap_path")]
    pub path: String,
}

fn default_sitemap_path() -> String {
    "sitemap.xml".to_string()
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            enable: true,
            path: default_sitemap_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Episode feed configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodesConfig {
    /// Endpoint returning `{ "items": [...] }` in the Spotify show-episodes shape
    pub endpoint: String,
    /// Environment variable holding a bearer token, if the endpoint needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
    #[serde(default = "default_episode_limit")]
    pub limit: usize,
}

fn default_episode_limit() -> usize {
    6
}

// =============================================================================
// Development configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// File watching configuration
    #[serde(default)]
    pub watch: WatchConfig,
    /// Enable live reload in the browser when files change (default: true)
    #[serde(default = "default_true")]
    pub live_reload: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            live_reload: true,
        }
    }
}

/// Configuration for file watching during development.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Use polling-based watcher instead of native file system events.
    /// Useful for network filesystems, Docker volumes, or other situations
    /// where native events are unreliable.
    #[serde(default)]
    pub poll: bool,
    /// Poll interval in milliseconds (only used if poll=true).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Debounce timeout in milliseconds.
    /// Changes within this window are batched together.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_debounce_ms() -> u64 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll: false,
            poll_interval_ms: default_poll_interval_ms(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
