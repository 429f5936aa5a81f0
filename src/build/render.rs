use std::path::Path;

use serde::{Deserialize, Serialize};
use tera::{Context, Tera};

use super::collection::Collection;
use super::document::{AuthorFrontMatter, Entry, FrontMatter};
use super::episodes::Episode;
use super::paths::{is_tag_segment, normalize_tag, tag_url};
use super::seo::PageSeo;
use super::tags::TagCount;
use super::toc::TocEntry;
use crate::config::{NavLink, ProjectConfig, RootConfig};
use crate::util::format_date;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("theme not found: {0}")]
    ThemeNotFound(String),
}

// =============================================================================
// Layouts
// =============================================================================

/// Page layouts selectable from front matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layout {
    PostLayout,
    PostSimple,
    SnippetLayout,
    ListLayout,
    AuthorLayout,
}

/// Template of each layout, indexed by discriminant.
const LAYOUT_TEMPLATES: [&str; 5] = [
    "layouts/post_layout.html",
    "layouts/post_simple.html",
    "layouts/snippet_layout.html",
    "layouts/list_layout.html",
    "layouts/author_layout.html",
];

impl Layout {
    pub fn template(self) -> &'static str {
        LAYOUT_TEMPLATES[self as usize]
    }
}

pub const INDEX_TEMPLATE: &str = "index.html";
pub const TAGS_TEMPLATE: &str = "tags.html";
pub const PLACEHOLDER_TEMPLATE: &str = "placeholder.html";
pub const NOT_FOUND_TEMPLATE: &str = "404.html";
pub const PROJECTS_TEMPLATE: &str = "projects.html";

/// The default theme, compiled into the binary.
const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../theme/templates/base.html")),
    (INDEX_TEMPLATE, include_str!("../../theme/templates/index.html")),
    (TAGS_TEMPLATE, include_str!("../../theme/templates/tags.html")),
    (PLACEHOLDER_TEMPLATE, include_str!("../../theme/templates/placeholder.html")),
    (NOT_FOUND_TEMPLATE, include_str!("../../theme/templates/404.html")),
    (PROJECTS_TEMPLATE, include_str!("../../theme/templates/projects.html")),
    (
        "layouts/post_layout.html",
        include_str!("../../theme/templates/layouts/post_layout.html"),
    ),
    (
        "layouts/post_simple.html",
        include_str!("../../theme/templates/layouts/post_simple.html"),
    ),
    (
        "layouts/snippet_layout.html",
        include_str!("../../theme/templates/layouts/snippet_layout.html"),
    ),
    (
        "layouts/list_layout.html",
        include_str!("../../theme/templates/layouts/list_layout.html"),
    ),
    (
        "layouts/author_layout.html",
        include_str!("../../theme/templates/layouts/author_layout.html"),
    ),
];

// =============================================================================
// Renderer
// =============================================================================

/// The template renderer, wrapping Tera.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Create a renderer from the embedded theme, with templates from
    /// `theme_path/templates` taking precedence when a theme is given.
    pub fn new(theme_path: Option<&Path>) -> Result<Self, RenderError> {
        let mut embedded = Tera::default();
        embedded.add_raw_templates(EMBEDDED_TEMPLATES.iter().copied())?;

        let Some(theme_path) = theme_path else {
            return Ok(Self { tera: embedded });
        };

        let templates_path = theme_path.join("templates");
        if !templates_path.is_dir() {
            return Err(RenderError::ThemeNotFound(
                theme_path.display().to_string(),
            ));
        }

        let glob = templates_path.join("**/*.html");
        let mut tera = Tera::parse(&glob.to_string_lossy())?;
        // Existing names are kept, so theme templates win over embedded ones.
        tera.extend(&embedded)?;

        Ok(Self { tera })
    }

    /// Render a named template with any serializable page context.
    pub fn render<C: Serialize>(&self, template: &str, context: &C) -> Result<String, RenderError> {
        let context = Context::from_serialize(context)?;
        Ok(self.tera.render(template, &context)?)
    }

    pub fn render_layout<C: Serialize>(&self, layout: Layout, context: &C) -> Result<String, RenderError> {
        self.render(layout.template(), context)
    }
}

// =============================================================================
// Template contexts
// =============================================================================

/// Site-level information available to every template as `site`.
#[derive(Debug, Clone, Serialize)]
pub struct SiteContext {
    pub title: String,
    pub author: String,
    pub description: String,
    pub url: String,
    pub language: String,
    pub locale: String,
    pub email: Option<String>,
    pub twitter: Option<String>,
    pub repository: Option<String>,
    pub logo: Option<String>,
    pub nav: Vec<NavLink>,
    pub feed_url: Option<String>,
    /// Stylesheet for highlighted code, when the theme produces one
    pub highlight_css: Option<String>,
    pub live_reload: bool,
    pub version: String,
    /// Theme settings from config, accessible as `site.theme.*`
    pub theme: serde_json::Value,
}

impl SiteContext {
    pub fn from_config(config: &RootConfig, highlight_css: Option<String>, live_reload: bool) -> Self {
        let site = &config.site;
        Self {
            title: site.title.clone(),
            author: site.author.clone(),
            description: site.description.clone(),
            url: config.base_url().to_string(),
            language: site.language.clone(),
            locale: site.locale.clone(),
            email: site.email.clone(),
            twitter: site.twitter.clone(),
            repository: site.repository.clone(),
            logo: site.logo.clone(),
            nav: site.nav.clone(),
            feed_url: config
                .feed
                .enable
                .then(|| format!("/{}", config.feed.path.trim_start_matches('/'))),
            highlight_css,
            live_reload,
            version: env!("CARGO_PKG_VERSION").to_string(),
            theme: config.theme.settings.clone(),
        }
    }
}

/// A link to another page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub title: String,
    pub url: String,
}

impl PageLink {
    pub fn to_entry<T: Entry>(entry: &T) -> Self {
        Self {
            title: entry.title().to_string(),
            url: entry.url(),
        }
    }
}

/// What listings show of a post or snippet.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub title: String,
    pub slug: String,
    pub url: String,
    /// ISO date for `<time datetime>`
    pub date: Option<String>,
    pub date_display: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<PageLink>,
    pub draft: bool,
}

impl EntrySummary {
    pub fn from_entry<T: Entry>(entry: &T) -> Self {
        Self {
            title: entry.title().to_string(),
            slug: entry.slug().to_string(),
            url: entry.url(),
            date: entry.date().map(|d| d.format("%Y-%m-%d").to_string()),
            date_display: entry.date().map(format_date),
            summary: entry.summary().map(str::to_string),
            tags: entry
                .tags()
                .iter()
                .filter_map(|tag| {
                    let name = normalize_tag(tag);
                    is_tag_segment(&name).then(|| PageLink {
                        title: tag.clone(),
                        url: tag_url(&name),
                    })
                })
                .collect(),
            draft: entry.is_draft(),
        }
    }
}

/// Page number navigation for paginated listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current: usize,
    pub total: usize,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl Pagination {
    /// Page `current` (1-based) of `total` under `base`. Page one lives at
    /// `base` itself, later pages at `base/page/{n}`.
    pub fn new(base: &str, current: usize, total: usize) -> Self {
        let url = |page: usize| {
            if page == 1 {
                base.to_string()
            } else {
                page_url(base, page)
            }
        };
        Self {
            current,
            total,
            prev: (current > 1).then(|| url(current - 1)),
            next: (current < total).then(|| url(current + 1)),
        }
    }

    /// Number of pages needed for `items`. Always at least one.
    pub fn page_count(items: usize, per_page: usize) -> usize {
        items.div_ceil(per_page.max(1)).max(1)
    }
}

pub fn page_url(base: &str, page: usize) -> String {
    format!("{base}/page/{page}")
}

/// Context for the post, snippet and author layouts.
#[derive(Debug, Serialize)]
pub struct ArticlePage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub entry: EntrySummary,
    /// The full front matter, including collection-specific fields
    pub front_matter: &'a FrontMatter,
    pub content: &'a str,
    pub toc: &'a [TocEntry],
    pub authors: Vec<&'a AuthorFrontMatter>,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
    /// Source file on the repository host, when a repository is configured
    pub edit_url: Option<String>,
    pub discuss_url: String,
}

/// Link to an entry's source file in the site repository.
pub fn edit_url(config: &RootConfig, collection: Collection, file_name: &str) -> Option<String> {
    let repository = config.site.repository.as_deref()?;
    let content = config.content.path.to_string_lossy();
    Some(format!(
        "{}/blob/{}/{}/{}/{}",
        repository.trim_end_matches('/'),
        config.site.repository_branch,
        content.trim_matches('/'),
        collection.dir_name(),
        file_name,
    ))
}

/// Twitter search for mentions of a page.
pub fn discuss_url(config: &RootConfig, url_path: &str) -> String {
    let page = format!("{}{}", config.base_url(), url_path);
    format!("https://mobile.twitter.com/search?q={}", urlencoding::encode(&page))
}

/// Context for an author page such as `/about`.
#[derive(Debug, Serialize)]
pub struct AuthorPage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub author: &'a AuthorFrontMatter,
    pub content: &'a str,
}

/// Context for the list layout.
#[derive(Debug, Serialize)]
pub struct ListPage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub title: String,
    pub entries: Vec<EntrySummary>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Serialize)]
pub struct TagsPage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub tags: Vec<&'a TagCount>,
}

#[derive(Debug, Serialize)]
pub struct HomePage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub posts: Vec<EntrySummary>,
    pub snippets: Vec<EntrySummary>,
    pub episodes: &'a [Episode],
}

#[derive(Debug, Serialize)]
pub struct ProjectsPage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub projects: &'a [ProjectConfig],
}

/// Context for draft pages and the 404 page.
#[derive(Debug, Serialize)]
pub struct PlainPage<'a> {
    pub site: &'a SiteContext,
    pub seo: PageSeo,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::{PostFrontMatter, parse_front_matter};

    fn config() -> RootConfig {
        serde_yaml::from_str("site:\n  title: My Blog\n  author: Jane\n  url: https://example.com/\n").unwrap()
    }

    fn post() -> PostFrontMatter {
        let mut fm: PostFrontMatter =
            parse_front_matter("---\ntitle: Hello World\ndate: 2023-03-01\ntags: [Web Dev]\n---\n")
                .unwrap()
                .front_matter;
        fm.set_origin("hello".to_string(), "hello.md".to_string());
        fm
    }

    #[test]
    fn test_every_layout_has_an_embedded_template() {
        let layouts = [
            Layout::PostLayout,
            Layout::PostSimple,
            Layout::SnippetLayout,
            Layout::ListLayout,
            Layout::AuthorLayout,
        ];
        for layout in layouts {
            assert!(
                EMBEDDED_TEMPLATES.iter().any(|(name, _)| *name == layout.template()),
                "{layout:?}"
            );
        }
        assert_eq!(Layout::PostSimple.template(), "layouts/post_simple.html");
    }

    #[test]
    fn test_layout_names_deserialize() {
        let layout: Layout = serde_yaml::from_str("PostSimple").unwrap();
        assert_eq!(layout, Layout::PostSimple);
        assert!(serde_yaml::from_str::<Layout>("FancyLayout").is_err());
    }

    #[test]
    fn test_pagination() {
        assert_eq!(Pagination::page_count(0, 6), 1);
        assert_eq!(Pagination::page_count(6, 6), 1);
        assert_eq!(Pagination::page_count(7, 6), 2);

        let first = Pagination::new("/blog", 1, 3);
        assert_eq!(first.prev, None);
        assert_eq!(first.next.as_deref(), Some("/blog/page/2"));

        let second = Pagination::new("/blog", 2, 3);
        assert_eq!(second.prev.as_deref(), Some("/blog"));
        assert_eq!(second.next.as_deref(), Some("/blog/page/3"));

        let last = Pagination::new("/blog", 3, 3);
        assert_eq!(last.next, None);
    }

    #[test]
    fn test_entry_summary() {
        let summary = EntrySummary::from_entry(&post());
        assert_eq!(summary.url, "/blog/hello");
        assert_eq!(summary.date.as_deref(), Some("2023-03-01"));
        assert_eq!(summary.date_display.as_deref(), Some("March 1, 2023"));
        assert_eq!(summary.tags[0].title, "Web Dev");
        assert_eq!(summary.tags[0].url, "/tags/web-dev");
    }

    #[test]
    fn test_render_article_with_embedded_theme() {
        let config = config();
        let site = SiteContext::from_config(&config, None, false);
        let renderer = Renderer::new(None).unwrap();
        let entry = post();
        let front_matter = FrontMatter::from(entry.clone());
        let toc = vec![TocEntry {
            text: "Setup".to_string(),
            anchor: "setup".to_string(),
            depth: 2,
        }];

        let page = ArticlePage {
            site: &site,
            seo: PageSeo::article(&config.site, "/feed.xml", &entry, &[]),
            entry: EntrySummary::from_entry(&entry),
            front_matter: &front_matter,
            content: "<p>Body text</p>",
            toc: &toc,
            authors: Vec::new(),
            prev: None,
            next: None,
            edit_url: Some("https://github.com/jane/blog/blob/master/data/blog/hello.md".to_string()),
            discuss_url: discuss_url(&config, "/blog/hello"),
        };
        let html = renderer.render_layout(entry.layout(), &page).unwrap();

        assert!(html.contains("<p>Body text</p>"));
        assert!(html.contains("Hello World"));
        assert!(html.contains("March 1, 2023"));
        assert!(html.contains("#setup"));
        assert!(html.contains("application/ld+json"));
        assert!(html.contains("View on GitHub"));
        assert!(html.contains("Discuss on Twitter"));
        assert!(!html.contains("EventSource"));
    }

    #[test]
    fn test_edit_and_discuss_urls() {
        let mut config = config();
        assert_eq!(edit_url(&config, Collection::Posts, "hello.md"), None);

        config.site.repository = Some("https://github.com/jane/blog/".to_string());
        assert_eq!(
            edit_url(&config, Collection::Posts, "rust/intro.md").as_deref(),
            Some("https://github.com/jane/blog/blob/master/data/blog/rust/intro.md")
        );
        config.site.repository_branch = "main".to_string();
        assert_eq!(
            edit_url(&config, Collection::Snippets, "curl.md").as_deref(),
            Some("https://github.com/jane/blog/blob/main/data/snippets/curl.md")
        );

        assert_eq!(
            discuss_url(&config, "/blog/hello"),
            "https://mobile.twitter.com/search?q=https%3A%2F%2Fexample.com%2Fblog%2Fhello"
        );
    }

    #[test]
    fn test_render_projects() {
        let config: RootConfig = serde_yaml::from_str(
            "site:\n  title: My Blog\n  author: Jane\n  url: https://example.com\nprojects:\n  - title: Search Engine\n    description: Finds things.\n    imgSrc: /static/images/search.png\n    href: https://example.com/search\n  - title: Time Machine\n",
        )
        .unwrap();
        let site = SiteContext::from_config(&config, None, false);
        let page = ProjectsPage {
            site: &site,
            seo: PageSeo::website(&config.site, "/feed.xml", "Projects - Jane", "", "/projects"),
            projects: &config.projects,
        };
        let html = Renderer::new(None).unwrap().render(PROJECTS_TEMPLATE, &page).unwrap();

        assert!(html.contains("Search Engine"));
        assert!(html.contains("Finds things."));
        assert!(html.contains(&tera::escape_html("/static/images/search.png")));
        assert!(html.contains(&tera::escape_html("https://example.com/search")));
        assert!(html.contains("Time Machine"));
        // A card without a link has no anchor.
        assert_eq!(html.matches("Learn more").count(), 1);
    }

    #[test]
    fn test_live_reload_script() {
        let config = config();
        let site = SiteContext::from_config(&config, None, true);
        let renderer = Renderer::new(None).unwrap();
        let page = PlainPage {
            site: &site,
            seo: PageSeo::website(&config.site, "/feed.xml", "Not Found", "", "/404"),
            title: "Not Found".to_string(),
        };
        let html = renderer.render(NOT_FOUND_TEMPLATE, &page).unwrap();
        assert!(html.contains("EventSource"));
    }

    #[test]
    fn test_theme_overrides_embedded_templates() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join("404.html"), "custom {{ title }}").unwrap();

        let config = config();
        let site = SiteContext::from_config(&config, None, false);
        let renderer = Renderer::new(Some(dir.path())).unwrap();
        let page = PlainPage {
            site: &site,
            seo: PageSeo::website(&config.site, "/feed.xml", "Gone", "", "/404"),
            title: "Gone".to_string(),
        };
        assert_eq!(renderer.render(NOT_FOUND_TEMPLATE, &page).unwrap(), "custom Gone");
        // Templates the theme does not provide fall back to the embedded ones.
        assert!(renderer.render(PLACEHOLDER_TEMPLATE, &page).unwrap().contains("Under Construction"));
    }

    #[test]
    fn test_missing_theme() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Renderer::new(Some(&dir.path().join("nope"))),
            Err(RenderError::ThemeNotFound(_))
        ));
    }
}
