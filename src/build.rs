mod artifact;
mod builder;
mod citation;
mod collection;
mod compiler;
mod document;
mod episodes;
mod feed;
mod highlight;
mod markdown;
mod paths;
mod pipeline;
mod render;
mod seo;
mod sitemap;
mod tags;
mod toc;
mod watch;

pub use builder::{BuildResult, Builder, STATIC_DIR};
pub use document::render_front_matter;
pub use markdown::Plugin;
pub use paths::base_path_from_config;
pub use watch::{ChangeKind, FileWatcher, WatchEvent, WatchPaths};
