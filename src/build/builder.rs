use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::RootConfig;

use super::citation::{Bibliography, CitationError};
use super::collection::{Collection, CollectionError, CollectionIndex};
use super::document::{AuthorFrontMatter, Entry, PostFrontMatter, SnippetFrontMatter};
use super::episodes::{Episode, EpisodeClient};
use super::highlight::SyntaxHighlighter;
use super::markdown::{MarkdownContext, MarkdownError, MarkdownOptions, Plugin};
use super::pipeline::{
    Collections, DEFAULT_AUTHOR, HIGHLIGHT_CSS_PATH, Pipeline, PipelineContext, PipelineError,
    ProcessingDocument,
};
use super::render::{RenderError, Renderer, SiteContext};

/// Directory next to the config file copied verbatim into the output.
pub const STATIC_DIR: &str = "static";

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error("markdown configuration error: {0}")]
    Markdown(#[from] MarkdownError),

    #[error("bibliography error: {0}")]
    Bibliography(#[from] CitationError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A content file left out of the build, with the reason.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub message: String,
}

pub struct BuildResult {
    pub output_dir: PathBuf,
    /// Content documents rendered to their own page
    pub documents: usize,
    /// HTML pages written, listings included
    pub pages: usize,
    pub static_files: usize,
    pub failures: Vec<DocumentFailure>,
}

pub struct Builder {
    config: RootConfig,
    /// Base path for resolving relative paths (typically the config file's directory)
    base_path: PathBuf,
    dev_mode: bool,
    live_reload: bool,
}

impl Builder {
    pub fn new(config: RootConfig, base_path: PathBuf) -> Self {
        Self {
            config,
            base_path,
            dev_mode: false,
            live_reload: false,
        }
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    /// Inject the live reload script into pages. Only honoured in dev mode.
    pub fn with_live_reload(mut self, live_reload: bool) -> Self {
        self.live_reload = live_reload;
        self
    }

    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        // Build steps:
        // 1. Index collections -> sorted front matter, tags
        // 2. Load markdown options, bibliography, renderer
        // 3. Fetch episodes for the home page
        // 4. Run the pipeline over every document, then listings, feeds, sitemap
        // 5. Copy static files

        let content_root = self.base_path.join(&self.config.content.path);
        let locales = &self.config.site.locales;
        let collections = load_collections(&content_root, locales)?;
        info!(
            posts = collections.posts.len(),
            snippets = collections.snippets.len(),
            authors = collections.authors.len(),
            tags = collections.tags.len(),
            "indexed content"
        );

        let options = MarkdownOptions::from_config(&self.config.markdown)?;
        let bibliography = self.load_bibliography(&options)?;
        let highlighter = SyntaxHighlighter::new(&self.config.markdown.highlight_theme);
        let highlight_css = highlighter.generate_css();

        let theme_path = self.theme_path();
        let renderer = Renderer::new(theme_path.as_deref())?;

        let episodes = self.fetch_episodes().await;

        let output_dir = self.output_dir();
        std::fs::create_dir_all(&output_dir)?;

        let site = SiteContext::from_config(
            &self.config,
            highlight_css.as_ref().map(|_| HIGHLIGHT_CSS_PATH.to_string()),
            self.dev_mode && self.live_reload,
        );

        let mut docs = self.documents(&collections);
        let documents = docs.len();

        let mut ctx = PipelineContext {
            config: &self.config,
            output_dir: &output_dir,
            site: &site,
            renderer: &renderer,
            markdown: MarkdownContext {
                options: &options,
                highlighter: &highlighter,
                bibliography: bibliography.as_ref(),
            },
            collections,
            episodes: &episodes,
            highlight_css: highlight_css.as_deref(),
            pages_written: 0,
        };

        let pipeline = Pipeline::default_pipeline();
        debug!(stages = ?pipeline.stage_names(), "running pipeline");
        pipeline.run(&mut docs, &mut ctx)?;
        let pages = ctx.pages_written;

        let static_files = copy_static(&self.base_path.join(STATIC_DIR), &output_dir.join(STATIC_DIR))?;

        let failures = collect_failures(&ctx.collections, &docs);
        for failure in &failures {
            warn!(path = %failure.path.display(), error = %failure.message, "document skipped");
        }

        let display_output = output_dir.canonicalize().unwrap_or(output_dir.clone());
        info!(
            pages,
            static_files,
            failed = failures.len(),
            output = %display_output.display(),
            "build finished"
        );

        Ok(BuildResult {
            output_dir,
            documents,
            pages,
            static_files,
            failures,
        })
    }

    /// One processing document per indexed post and snippet, plus `/about`
    /// from the default author.
    fn documents(&self, collections: &Collections) -> Vec<ProcessingDocument> {
        let mut docs = Vec::new();
        push_documents(&mut docs, &collections.posts);
        push_documents(&mut docs, &collections.snippets);

        match collections.authors.get(DEFAULT_AUTHOR) {
            Ok(author) => {
                let source_path = collections.authors.source_path(author);
                docs.push(read_document(
                    Collection::Authors,
                    source_path,
                    "/about".to_string(),
                    author.slug(),
                    author.file_name(),
                ));
            }
            Err(error) => warn!(%error, "no /about page"),
        }

        docs
    }

    fn load_bibliography(&self, options: &MarkdownOptions) -> Result<Option<Bibliography>, BuildError> {
        let Some(path) = &self.config.markdown.bibliography else {
            return Ok(None);
        };
        if !options.enabled(Plugin::Citation) {
            return Ok(None);
        }
        let bibliography = Bibliography::load(&self.base_path.join(path))?;
        debug!(references = bibliography.len(), "loaded bibliography");
        Ok(Some(bibliography))
    }

    async fn fetch_episodes(&self) -> Vec<Episode> {
        match &self.config.episodes {
            Some(config) => EpisodeClient::from_config(config).fetch().await,
            None => Vec::new(),
        }
    }

    /// Get the output directory path, resolved against base_path.
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.config.site.output)
    }

    /// Theme directory resolved against base_path, if one is configured.
    pub fn theme_path(&self) -> Option<PathBuf> {
        self.config
            .theme
            .path
            .as_ref()
            .map(|path| self.base_path.join(path))
    }
}

fn load_collections(content_root: &Path, locales: &[String]) -> Result<Collections, CollectionError> {
    let posts: CollectionIndex<PostFrontMatter> = CollectionIndex::load(content_root, locales)?;
    let snippets: CollectionIndex<SnippetFrontMatter> = CollectionIndex::load(content_root, locales)?;
    let authors: CollectionIndex<AuthorFrontMatter> = CollectionIndex::load(content_root, locales)?;
    Ok(Collections::new(posts, snippets, authors))
}

fn push_documents<T: Entry>(docs: &mut Vec<ProcessingDocument>, index: &CollectionIndex<T>) {
    for entry in index.entries() {
        docs.push(read_document(
            T::COLLECTION,
            index.source_path(entry),
            entry.url(),
            entry.slug(),
            entry.file_name(),
        ));
    }
}

fn read_document(
    collection: Collection,
    source_path: PathBuf,
    url_path: String,
    slug: &str,
    file_name: &str,
) -> ProcessingDocument {
    let raw = std::fs::read_to_string(&source_path);
    let mut doc = ProcessingDocument::new(
        collection,
        source_path,
        url_path,
        slug.to_string(),
        file_name.to_string(),
        String::new(),
    );
    match raw {
        Ok(raw) => doc.raw = raw,
        Err(error) => doc.fail(format!("failed to read: {error}")),
    }
    doc
}

fn collect_failures(collections: &Collections, docs: &[ProcessingDocument]) -> Vec<DocumentFailure> {
    let indexed = collections
        .posts
        .failures()
        .iter()
        .chain(collections.snippets.failures())
        .chain(collections.authors.failures())
        .map(|failure| DocumentFailure {
            path: failure.path.clone(),
            message: failure.error.to_string(),
        });

    let compiled = docs.iter().filter_map(|doc| {
        doc.failure.as_ref().map(|message| DocumentFailure {
            path: doc.source_path.clone(),
            message: message.clone(),
        })
    });

    indexed.chain(compiled).collect()
}

/// Copy a directory tree into the output. A missing source is not an error.
fn copy_static(from: &Path, to: &Path) -> Result<usize, std::io::Error> {
    if !from.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    let mut entries: Vec<_> = std::fs::read_dir(from)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copied += copy_static(&path, &target)?;
        } else {
            std::fs::create_dir_all(to)?;
            std::fs::copy(&path, &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn config() -> RootConfig {
        serde_yaml::from_str(
            "site:\n  title: My Blog\n  author: Jane\n  url: https://example.com\n  posts_per_page: 2\n",
        )
        .unwrap()
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "data/blog/post1.md",
            "---\ntitle: Post One\ndate: 2023-03-01\ntags: [Rust]\n---\n# Setup\n\nFirst.\n\n# Setup\n",
        );
        write(
            root,
            "data/blog/post2.md",
            "---\ntitle: Post Two\ndate: 2023-01-15\ntags: [rust, Web Dev]\n---\nSecond.\n",
        );
        write(
            root,
            "data/blog/post3.md",
            "---\ntitle: Post Three\ndate: 2023-03-01\n---\nThird.\n",
        );
        write(
            root,
            "data/blog/secret.md",
            "---\ntitle: Secret Plans\ndate: 2023-04-01\ndraft: true\ntags: [hidden]\n---\nNot yet.\n",
        );
        write(root, "data/blog/broken.md", "---\ntitle: [unclosed\n---\nBody\n");
        write(
            root,
            "data/snippets/curl.md",
            "---\ntitle: Curl Tricks\ndate: 2023-02-01\n---\n```bash\ncurl -I example.com\n```\n",
        );
        write(
            root,
            "data/authors/default.md",
            "---\nname: Jane Doe\noccupation: Engineer\n---\nHello, I write things.\n",
        );
        write(root, "static/images/logo.png", "png");
        dir
    }

    fn read(root: &Path, rel: &str) -> String {
        fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
    }

    /// A link as the templates write it, with autoescaped slashes.
    fn href(url: &str) -> String {
        format!("href=\"{}\"", tera::escape_html(url))
    }

    #[tokio::test]
    async fn test_build_site() {
        let dir = site();
        let root = dir.path();
        let result = Builder::new(config(), root.to_path_buf())
            .build()
            .await
            .unwrap();

        let out = root.join("_site");
        assert_eq!(result.output_dir, out);
        assert_eq!(result.static_files, 1);
        assert!(out.join("static/images/logo.png").exists());

        let post = read(&out, "blog/post1/index.html");
        assert!(post.contains("Post One"));
        assert!(post.contains("id=setup-1") || post.contains(r#"id="setup-1""#));
        assert!(post.contains(r##"href="#setup-1""##));
        assert!(post.contains("Jane Doe"));

        assert!(read(&out, "snippets/curl/index.html").contains("Curl Tricks"));
        assert!(read(&out, "about/index.html").contains("I write things"));
        assert!(read(&out, "404.html").contains("404"));
        assert!(out.join("index.html").exists());
        assert!(out.join("tags/index.html").exists());
        assert!(out.join("tags/rust/index.html").exists());
        assert!(out.join("tags/web-dev/feed.xml").exists());
        assert!(read(&out, "sitemap.xml").contains("<loc>https://example.com/about</loc>"));
        // No edit link without a configured repository.
        assert!(!post.contains("View on GitHub"));
        assert!(post.contains("Discuss on Twitter"));

        // Three published posts over two per page.
        assert!(out.join("blog/index.html").exists());
        assert!(out.join("blog/page/2/index.html").exists());
        assert!(!out.join("blog/page/3").exists());

        let blog = read(&out, "blog/index.html");
        let page2 = read(&out, "blog/page/2/index.html");
        assert!(blog.find("Post One").unwrap() < blog.find("Post Three").unwrap());
        assert!(page2.contains("Post Two"));
    }

    #[tokio::test]
    async fn test_drafts_render_placeholder_only() {
        let dir = site();
        let root = dir.path();
        Builder::new(config(), root.to_path_buf())
            .build()
            .await
            .unwrap();
        let out = root.join("_site");

        let draft = read(&out, "blog/secret/index.html");
        assert!(draft.contains("Under Construction"));
        assert!(!draft.contains("Not yet."));

        assert!(!read(&out, "feed.xml").contains("Secret Plans"));
        assert!(!read(&out, "sitemap.xml").contains("/blog/secret"));
        assert!(!read(&out, "blog/index.html").contains("Secret Plans"));
        assert!(!out.join("tags/hidden").exists());
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let dir = site();
        let root = dir.path();
        let result = Builder::new(config(), root.to_path_buf())
            .build()
            .await
            .unwrap();

        assert_eq!(result.failures.len(), 1);
        assert!(result.failures[0].path.ends_with("broken.md"));
        assert!(!root.join("_site/blog/broken").exists());
        assert!(read(&root.join("_site"), "sitemap.xml").contains("https://example.com/blog/post3"));
    }

    #[tokio::test]
    async fn test_failed_compile_leaves_no_links() {
        let dir = site();
        let root = dir.path();
        write(
            root,
            "data/blog/badmath.md",
            "---\ntitle: Bad Math\ndate: 2023-02-20\ntags: [Broken]\n---\nSee $\\notacommand{x}$.\n",
        );
        let result = Builder::new(config(), root.to_path_buf())
            .build()
            .await
            .unwrap();
        let out = root.join("_site");

        assert_eq!(result.failures.len(), 2);
        assert!(result.failures.iter().any(|f| f.path.ends_with("badmath.md")));
        assert!(!out.join("blog/badmath").exists());

        assert!(!read(&out, "feed.xml").contains("Bad Math"));
        assert!(!read(&out, "sitemap.xml").contains("/blog/badmath"));
        assert!(!read(&out, "blog/index.html").contains("Bad Math"));
        assert!(!read(&out, "index.html").contains("Bad Math"));
        assert!(!read(&out, "tags/index.html").contains("Broken"));
        assert!(!out.join("tags/broken").exists());

        // post3 and post2 sit on either side of the failed post by date.
        let post3 = read(&out, "blog/post3/index.html");
        assert!(!post3.contains(&href("/blog/badmath")));
        assert!(post3.contains(&href("/blog/post2")));
        assert!(!read(&out, "blog/post2/index.html").contains(&href("/blog/badmath")));
    }

    #[tokio::test]
    async fn test_dot_tag_cannot_escape_tags_dir() {
        let dir = site();
        let root = dir.path();
        write(
            root,
            "data/blog/dots.md",
            "---\ntitle: Dot Dot\ndate: 2023-05-01\ntags: ['..', rust]\n---\nUp a level.\n",
        );
        Builder::new(config(), root.to_path_buf())
            .build()
            .await
            .unwrap();
        let out = root.join("_site");

        let home = read(&out, "index.html");
        assert!(home.contains("<title>My Blog</title>"));
        assert!(home.contains("Latest Posts"));

        let feed = read(&out, "feed.xml");
        assert!(feed.contains("<title>My Blog</title>"));
        assert!(!feed.contains("My Blog - .."));
        assert!(feed.contains("Dot Dot"));

        let tagged = read(&out, "blog/dots/index.html");
        assert!(tagged.contains(&href("/tags/rust")));
        assert!(!tagged.contains(&href("/tags/..")));
        assert!(read(&out, "tags/rust/index.html").contains("Dot Dot"));
    }

    #[tokio::test]
    async fn test_projects_and_source_links() {
        let dir = site();
        let root = dir.path();
        let config: RootConfig = serde_yaml::from_str(
            "site:\n  title: My Blog\n  author: Jane\n  url: https://example.com\n  repository: https://github.com/jane/blog\nprojects:\n  - title: Search Engine\n    description: Finds things.\n    href: https://example.com/search\n",
        )
        .unwrap();
        Builder::new(config, root.to_path_buf())
            .build()
            .await
            .unwrap();
        let out = root.join("_site");

        let projects = read(&out, "projects/index.html");
        assert!(projects.contains("Search Engine"));
        assert!(projects.contains("<title>Projects - Jane</title>"));
        assert!(read(&out, "sitemap.xml").contains("<loc>https://example.com/projects</loc>"));

        let post = read(&out, "blog/post1/index.html");
        assert!(post.contains(&href(
            "https://github.com/jane/blog/blob/master/data/blog/post1.md"
        )));
        assert!(post.contains(&href(
            "https://mobile.twitter.com/search?q=https%3A%2F%2Fexample.com%2Fblog%2Fpost1"
        )));
    }

    #[tokio::test]
    async fn test_optional_pages_stay_out_of_sitemap() {
        let dir = site();
        let root = dir.path();
        fs::remove_file(root.join("data/authors/default.md")).unwrap();
        write(root, "data/authors/sam.md", "---\nname: Sam\n---\nGuest.\n");
        Builder::new(config(), root.to_path_buf())
            .build()
            .await
            .unwrap();
        let out = root.join("_site");

        assert!(!out.join("about").exists());
        assert!(!out.join("projects").exists());
        let sitemap = read(&out, "sitemap.xml");
        assert!(!sitemap.contains("https://example.com/about"));
        assert!(!sitemap.contains("https://example.com/projects"));
        assert!(sitemap.contains("<loc>https://example.com/blog</loc>"));
    }

    #[tokio::test]
    async fn test_live_reload_only_in_dev_mode() {
        let dir = site();
        let root = dir.path();

        Builder::new(config(), root.to_path_buf())
            .with_live_reload(true)
            .build()
            .await
            .unwrap();
        assert!(!read(&root.join("_site"), "index.html").contains("EventSource"));

        Builder::new(config(), root.to_path_buf())
            .with_dev_mode(true)
            .with_live_reload(true)
            .build()
            .await
            .unwrap();
        assert!(read(&root.join("_site"), "index.html").contains("EventSource"));
    }

    #[tokio::test]
    async fn test_missing_collection_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "data/blog/a.md", "---\ntitle: A\ndate: 2023-01-01\n---\n");
        let result = Builder::new(config(), dir.path().to_path_buf()).build().await;
        assert!(matches!(
            result,
            Err(BuildError::Collection(CollectionError::MissingDirectory(_)))
        ));
    }
}
