//! Page metadata for search engines and social cards.

use serde::Serialize;
use serde_json::json;

use super::document::{AuthorFrontMatter, Entry};
use crate::config::SiteConfig;

/// Metadata rendered into the `<head>` of every page.
#[derive(Debug, Clone, Serialize)]
pub struct PageSeo {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub og_type: &'static str,
    /// Absolute URLs of the social card images
    pub images: Vec<String>,
    pub feed: String,
    pub twitter: Option<String>,
    pub published: Option<String>,
    pub modified: Option<String>,
    /// Serialized JSON-LD object, safe to embed in a `<script>` element
    pub json_ld: Option<String>,
}

impl PageSeo {
    /// Metadata for listing and static pages.
    pub fn website(site: &SiteConfig, feed_path: &str, title: &str, description: &str, path: &str) -> Self {
        let base = base_url(site);
        Self {
            title: title.to_string(),
            description: description.to_string(),
            canonical: absolute(base, path),
            og_type: "website",
            images: vec![absolute(base, &site.social_banner)],
            feed: absolute(base, feed_path),
            twitter: site.twitter.clone(),
            published: None,
            modified: None,
            json_ld: None,
        }
    }

    /// Metadata for a post or snippet, including a JSON-LD `Article`.
    pub fn article<T: Entry>(
        site: &SiteConfig,
        feed_path: &str,
        entry: &T,
        authors: &[&AuthorFrontMatter],
    ) -> Self {
        let base = base_url(site);
        let canonical = absolute(base, &entry.url());
        let images: Vec<String> = if entry.images().is_empty() {
            vec![absolute(base, &site.social_banner)]
        } else {
            entry.images().iter().map(|img| absolute(base, img)).collect()
        };
        let published = entry.date().map(|d| d.format("%Y-%m-%d").to_string());
        let modified = entry.lastmod().map(|d| d.format("%Y-%m-%d").to_string());
        let description = entry.summary().unwrap_or(&site.description).to_string();

        let author_list: Vec<_> = if authors.is_empty() {
            vec![json!({ "@type": "Person", "name": site.author })]
        } else {
            authors
                .iter()
                .map(|a| json!({ "@type": "Person", "name": a.name }))
                .collect()
        };

        let mut publisher = json!({ "@type": "Organization", "name": site.author });
        if let Some(logo) = &site.logo {
            publisher["logo"] = json!({ "@type": "ImageObject", "url": absolute(base, logo) });
        }

        let structured = json!({
            "@context": "https://schema.org",
            "@type": "Article",
            "mainEntityOfPage": { "@type": "WebPage", "@id": canonical },
            "headline": entry.title(),
            "image": images
                .iter()
                .map(|url| json!({ "@type": "ImageObject", "url": url }))
                .collect::<Vec<_>>(),
            "datePublished": published,
            "dateModified": modified,
            "author": author_list,
            "publisher": publisher,
            "description": description,
        });

        Self {
            title: entry.title().to_string(),
            description,
            canonical,
            og_type: "article",
            images,
            feed: absolute(base, feed_path),
            twitter: site.twitter.clone(),
            published,
            modified,
            json_ld: Some(script_safe(&structured.to_string())),
        }
    }
}

fn base_url(site: &SiteConfig) -> &str {
    site.url.trim_end_matches('/')
}

fn absolute(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else if path == "/" {
        format!("{base}/")
    } else {
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

/// Keep `</script>` inside string values from closing the element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::document::{PostFrontMatter, parse_front_matter};

    fn site() -> SiteConfig {
        serde_yaml::from_str(
            "title: My Blog\nauthor: Jane\nurl: https://example.com\ndescription: Notes\nlogo: /static/logo.png\ntwitter: https://twitter.com/jane\n",
        )
        .unwrap()
    }

    fn post(extra: &str) -> PostFrontMatter {
        let raw = format!("---\ntitle: Hello </script>\ndate: 2023-03-01\n{extra}---\n");
        let mut fm: PostFrontMatter = parse_front_matter(&raw).unwrap().front_matter;
        fm.set_origin("hello".to_string(), "hello.md".to_string());
        fm
    }

    #[test]
    fn test_website_seo() {
        let seo = PageSeo::website(&site(), "/feed.xml", "Blog - Jane", "All posts", "/blog");
        assert_eq!(seo.canonical, "https://example.com/blog");
        assert_eq!(seo.og_type, "website");
        assert_eq!(seo.images, vec!["https://example.com/static/images/twitter-card.png"]);
        assert_eq!(seo.feed, "https://example.com/feed.xml");
        assert!(seo.json_ld.is_none());
    }

    #[test]
    fn test_article_defaults() {
        let seo = PageSeo::article(&site(), "/feed.xml", &post(""), &[]);
        assert_eq!(seo.canonical, "https://example.com/blog/hello");
        assert_eq!(seo.description, "Notes");
        assert_eq!(seo.published.as_deref(), Some("2023-03-01"));
        assert_eq!(seo.modified.as_deref(), Some("2023-03-01"));

        let json_ld = seo.json_ld.unwrap();
        assert!(!json_ld.contains("</script>"));
        let value: serde_json::Value = serde_json::from_str(&json_ld).unwrap();
        assert_eq!(value["@type"], "Article");
        assert_eq!(value["headline"], "Hello </script>");
        assert_eq!(value["image"][0]["url"], "https://example.com/static/images/twitter-card.png");
        assert_eq!(value["author"][0]["name"], "Jane");
        assert_eq!(value["publisher"]["logo"]["url"], "https://example.com/static/logo.png");
    }

    #[test]
    fn test_article_uses_lastmod_images_and_authors() {
        let entry = post("lastmod: 2023-04-01\nsummary: Short\nimages: [https://cdn.example.com/a.png, /b.png]\n");
        let author: AuthorFrontMatter = parse_front_matter("---\nname: Sam\n---\n").unwrap().front_matter;
        let seo = PageSeo::article(&site(), "/feed.xml", &entry, &[&author]);

        assert_eq!(seo.description, "Short");
        assert_eq!(seo.modified.as_deref(), Some("2023-04-01"));
        assert_eq!(
            seo.images,
            vec!["https://cdn.example.com/a.png", "https://example.com/b.png"]
        );
        let value: serde_json::Value = serde_json::from_str(&seo.json_ld.unwrap()).unwrap();
        assert_eq!(value["dateModified"], "2023-04-01");
        assert_eq!(value["author"][0]["name"], "Sam");
    }
}
