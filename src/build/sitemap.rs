//! Sitemap generation.
//!
//! Generates a sitemap.xml file listing every static route and every
//! published content page for search engine indexing.
//!
//! # Sitemap Format
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/blog/hello</loc>
//!     <lastmod>2023-03-01</lastmod>
//!   </url>
//! </urlset>
//! ```

use chrono::NaiveDate;

use super::document::Entry;
use super::tags::TagIndex;

/// XML namespace for sitemap
const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Every route the site serves. Bracketed segments are placeholders that
/// expand to one page per slug, tag or page number.
pub const ROUTES: &[&str] = &[
    "/",
    "/about",
    "/blog",
    "/blog/[slug]",
    "/blog/page/[page]",
    "/projects",
    "/snippets",
    "/snippets/[slug]",
    "/tags",
    "/tags/[tag]",
];

/// Whether a route contains a placeholder segment such as `[slug]`.
pub fn is_route_template(route: &str) -> bool {
    route
        .split('/')
        .any(|segment| segment.starts_with('[') && segment.ends_with(']'))
}

/// Single URL entry in the sitemap
#[derive(Debug, Clone, PartialEq, Eq)]
struct UrlEntry {
    loc: String,
    lastmod: Option<NaiveDate>,
}

/// Sitemap data structure
#[derive(Debug)]
pub struct Sitemap {
    base_url: String,
    urls: Vec<UrlEntry>,
}

impl Sitemap {
    pub fn new(site_url: &str) -> Self {
        Self {
            base_url: site_url.trim_end_matches('/').to_string(),
            urls: Vec::new(),
        }
    }

    /// Start a sitemap from the static routes, skipping route templates.
    pub fn from_routes<'r>(site_url: &str, routes: impl IntoIterator<Item = &'r str>) -> Self {
        let mut sitemap = Self::new(site_url);
        for route in routes.into_iter().filter(|r| !is_route_template(r)) {
            sitemap.add(route, None);
        }
        sitemap
    }

    /// Add the pages of published entries.
    pub fn add_entries<'e, T: Entry + 'e>(&mut self, entries: impl IntoIterator<Item = &'e T>) {
        for entry in entries.into_iter().filter(|e| !e.is_draft()) {
            self.add(&entry.url(), entry.lastmod());
        }
    }

    /// Add the listing page of every tag.
    pub fn add_tags(&mut self, tags: &TagIndex) {
        for tag in tags.iter() {
            self.add(&tag.url, None);
        }
    }

    pub fn add(&mut self, path: &str, lastmod: Option<NaiveDate>) {
        let loc = if path == "/" {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        };
        if self.urls.iter().any(|u| u.loc == loc) {
            return;
        }
        self.urls.push(UrlEntry { loc, lastmod });
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Generate sitemap XML string.
    pub fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
        xml.push('\n');

        for entry in self.urls {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
            if let Some(lastmod) = entry.lastmod {
                xml.push_str(&format!(
                    "    <lastmod>{}</lastmod>\n",
                    lastmod.format("%Y-%m-%d")
                ));
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::{PostFrontMatter, parse_front_matter};

    fn post(slug: &str, extra: &str) -> PostFrontMatter {
        let raw = format!("---\ntitle: {slug}\ndate: 2023-03-01\n{extra}---\n");
        let mut fm: PostFrontMatter = parse_front_matter(&raw).unwrap().front_matter;
        fm.set_origin(slug.to_string(), format!("{slug}.md"));
        fm
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("it's <x>"), "it&apos;s &lt;x&gt;");
    }

    #[test]
    fn test_route_templates() {
        assert!(is_route_template("/blog/[slug]"));
        assert!(is_route_template("/blog/page/[page]"));
        assert!(!is_route_template("/blog"));
        assert!(!is_route_template("/"));
    }

    #[test]
    fn test_from_routes_skips_templates() {
        let xml = Sitemap::from_routes("https://example.com/", ROUTES.iter().copied()).into_xml();
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/blog</loc>"));
        assert!(xml.contains("<loc>https://example.com/tags</loc>"));
        assert!(!xml.contains('['));
        assert_eq!(xml.matches("<url>").count(), 6);
    }

    #[test]
    fn test_entries_exclude_drafts() {
        let posts = vec![
            post("hello", "lastmod: 2023-03-05\n"),
            post("wip", "draft: true\n"),
        ];
        let mut sitemap = Sitemap::new("https://example.com");
        sitemap.add_entries(&posts);
        let xml = sitemap.into_xml();

        assert!(xml.contains("<loc>https://example.com/blog/hello</loc>"));
        assert!(xml.contains("<lastmod>2023-03-05</lastmod>"));
        assert!(!xml.contains("wip"));
    }

    #[test]
    fn test_tags_and_duplicates() {
        let posts = vec![post("a", "tags: [Rust]\n"), post("b", "tags: [rust]\n")];
        let tags = TagIndex::from_entries(&posts);
        let mut sitemap = Sitemap::new("https://example.com");
        sitemap.add_tags(&tags);
        sitemap.add("/tags/rust", None);
        assert_eq!(sitemap.len(), 1);
        assert!(sitemap.into_xml().contains("<loc>https://example.com/tags/rust</loc>"));
    }

    #[test]
    fn test_sitemap_empty() {
        let xml = Sitemap::new("https://example.com").into_xml();
        assert!(xml.contains(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#)));
        assert!(!xml.contains("<url>"));
    }
}
