//! Default pipeline stages.
//!
//! The standard document processing pipeline consists of:
//!
//! 1. **CompileStage** - Parse front matter and render markdown to HTML
//! 2. **TemplateStage** - Wrap content in its layout template
//! 3. **WriteStage** - Write final HTML to output directory
//!
//! followed by the build-wide stages:
//!
//! 1. **ListingsStage** - Home, blog, snippet, tag and 404 pages
//! 2. **FeedStage** - `feed.xml` and per-tag feeds
//! 3. **SitemapStage** - `sitemap.xml`

mod compile;
mod feed;
mod listings;
mod sitemap;
mod template;
mod write;

pub use compile::CompileStage;
pub use feed::FeedStage;
pub use listings::{HIGHLIGHT_CSS_PATH, ListingsStage};
pub use sitemap::SitemapStage;
pub use template::TemplateStage;
pub use write::WriteStage;
