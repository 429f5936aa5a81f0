//! Content documents and their front matter.
//!
//! Every collection has its own closed front matter struct, validated when
//! the YAML block is parsed. Unknown keys are ignored, unknown layouts and
//! unparseable dates are rejected. The slug and file name are always derived
//! from the file location and never read from YAML.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::collection::Collection;
use super::render::Layout;

// =============================================================================
// Errors
// =============================================================================

/// Malformed front matter. Fails the single document it belongs to.
#[derive(thiserror::Error, Debug)]
pub enum FrontMatterError {
    #[error("document does not start with a `---` front matter block")]
    Missing,

    #[error("front matter block is not closed by a `---` line")]
    Unclosed,

    #[error("invalid front matter: {0}")]
    Invalid(#[from] serde_yaml::Error),
}

// =============================================================================
// Entry trait
// =============================================================================

/// Shared view over the per-collection front matter types.
pub trait Entry: DeserializeOwned + Serialize + Clone + std::fmt::Debug {
    const COLLECTION: Collection;

    fn title(&self) -> &str;
    fn slug(&self) -> &str;
    fn file_name(&self) -> &str;
    /// Attach the location-derived identity after parsing.
    fn set_origin(&mut self, slug: String, file_name: String);
    fn layout(&self) -> Layout;

    fn date(&self) -> Option<NaiveDate> {
        None
    }

    fn lastmod(&self) -> Option<NaiveDate> {
        self.date()
    }

    fn is_draft(&self) -> bool {
        false
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn summary(&self) -> Option<&str> {
        None
    }

    fn images(&self) -> &[String] {
        &[]
    }

    fn authors(&self) -> Option<&[String]> {
        None
    }

    /// Site-relative URL of the rendered page.
    fn url(&self) -> String {
        format!("{}/{}", Self::COLLECTION.url_prefix(), self.slug())
    }
}

// =============================================================================
// Per-collection front matter
// =============================================================================

/// Front matter of a blog post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFrontMatter {
    pub title: String,
    #[serde(with = "date_format")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        default,
        with = "date_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub lastmod: Option<NaiveDate>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_attribution_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_attribution_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(skip)]
    pub slug: String,
    #[serde(skip)]
    pub file_name: String,
}

/// Front matter of a snippet. Snippets always use the snippet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetFrontMatter {
    pub title: String,
    #[serde(with = "date_format")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        default,
        with = "date_format::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub lastmod: Option<NaiveDate>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    #[serde(skip)]
    pub slug: String,
    #[serde(skip)]
    pub file_name: String,
}

/// Front matter of an author profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorFrontMatter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(skip)]
    pub slug: String,
    #[serde(skip)]
    pub file_name: String,
}

impl Entry for PostFrontMatter {
    const COLLECTION: Collection = Collection::Posts;

    fn title(&self) -> &str {
        &self.title
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn file_name(&self) -> &str {
        &self.file_name
    }
    fn set_origin(&mut self, slug: String, file_name: String) {
        self.slug = slug;
        self.file_name = file_name;
    }
    fn layout(&self) -> Layout {
        self.layout.unwrap_or(Layout::PostLayout)
    }
    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
    fn lastmod(&self) -> Option<NaiveDate> {
        self.lastmod.or(Some(self.date))
    }
    fn is_draft(&self) -> bool {
        self.draft
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
    fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
    fn images(&self) -> &[String] {
        &self.images
    }
    fn authors(&self) -> Option<&[String]> {
        self.authors.as_deref()
    }
}

impl Entry for SnippetFrontMatter {
    const COLLECTION: Collection = Collection::Snippets;

    fn title(&self) -> &str {
        &self.title
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn file_name(&self) -> &str {
        &self.file_name
    }
    fn set_origin(&mut self, slug: String, file_name: String) {
        self.slug = slug;
        self.file_name = file_name;
    }
    fn layout(&self) -> Layout {
        Layout::SnippetLayout
    }
    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
    fn lastmod(&self) -> Option<NaiveDate> {
        self.lastmod.or(Some(self.date))
    }
    fn is_draft(&self) -> bool {
        self.draft
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
    fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
    fn images(&self) -> &[String] {
        &self.images
    }
    fn authors(&self) -> Option<&[String]> {
        self.authors.as_deref()
    }
}

impl Entry for AuthorFrontMatter {
    const COLLECTION: Collection = Collection::Authors;

    fn title(&self) -> &str {
        &self.name
    }
    fn slug(&self) -> &str {
        &self.slug
    }
    fn file_name(&self) -> &str {
        &self.file_name
    }
    fn set_origin(&mut self, slug: String, file_name: String) {
        self.slug = slug;
        self.file_name = file_name;
    }
    fn layout(&self) -> Layout {
        self.layout.unwrap_or(Layout::AuthorLayout)
    }
}

/// Front matter of any collection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "collection", rename_all = "lowercase")]
pub enum FrontMatter {
    Post(PostFrontMatter),
    Snippet(SnippetFrontMatter),
    Author(AuthorFrontMatter),
}

impl FrontMatter {
    pub fn title(&self) -> &str {
        match self {
            FrontMatter::Post(fm) => fm.title(),
            FrontMatter::Snippet(fm) => fm.title(),
            FrontMatter::Author(fm) => fm.title(),
        }
    }

    pub fn is_draft(&self) -> bool {
        match self {
            FrontMatter::Post(fm) => fm.is_draft(),
            FrontMatter::Snippet(fm) => fm.is_draft(),
            FrontMatter::Author(fm) => fm.is_draft(),
        }
    }
}

impl From<PostFrontMatter> for FrontMatter {
    fn from(fm: PostFrontMatter) -> Self {
        FrontMatter::Post(fm)
    }
}

impl From<SnippetFrontMatter> for FrontMatter {
    fn from(fm: SnippetFrontMatter) -> Self {
        FrontMatter::Snippet(fm)
    }
}

impl From<AuthorFrontMatter> for FrontMatter {
    fn from(fm: AuthorFrontMatter) -> Self {
        FrontMatter::Author(fm)
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Result of parsing front matter from a content file.
#[derive(Debug)]
pub struct Parsed<T> {
    pub front_matter: T,
    /// The markdown content without the front matter block
    pub body: String,
}

/// Split a content file into its YAML block and body.
///
/// The block must open the file (after an optional BOM and leading blank
/// lines) with a `---` line and be closed by another `---` line:
///
/// ```markdown
/// ---
/// title: My Post
/// date: 2023-03-01
/// ---
///
/// # Content starts here
/// ```
pub fn split_front_matter(raw: &str) -> Result<(&str, &str), FrontMatterError> {
    let content = raw.trim_start_matches('\u{feff}').trim_start();

    let rest = content
        .strip_prefix("---")
        .ok_or(FrontMatterError::Missing)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .ok_or(FrontMatterError::Missing)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = rest[offset + line.len()..].trim_start_matches(['\r', '\n']);
            return Ok((yaml, body));
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unclosed)
}

/// Parse and validate the front matter of a content file.
pub fn parse_front_matter<T: DeserializeOwned>(raw: &str) -> Result<Parsed<T>, FrontMatterError> {
    let (yaml, body) = split_front_matter(raw)?;
    let front_matter = serde_yaml::from_str(yaml)?;
    Ok(Parsed {
        front_matter,
        body: body.to_string(),
    })
}

/// Serialize front matter back into a `---` delimited block.
pub fn render_front_matter<T: Serialize>(front_matter: &T) -> Result<String, FrontMatterError> {
    let yaml = serde_yaml::to_string(front_matter)?;
    Ok(format!("---\n{yaml}---\n"))
}

// =============================================================================
// Field helpers
// =============================================================================

/// Accept `images: foo.png` as well as a list.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(image)) => vec![image],
        Some(OneOrMany::Many(images)) => images,
    })
}

/// Calendar dates written as `2023-03-01`, `2023-03-01T10:00:00Z` or
/// `2023-03-01 10:00:00`. Always serialized as `YYYY-MM-DD`.
pub(crate) mod date_format {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        NaiveDate::parse_from_str(value, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
            .or_else(|| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.date())
            })
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_date(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{value}'")))
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDate>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDate>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(value) => super::parse_date(&value)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{value}'"))),
            }
        }
    }
}
