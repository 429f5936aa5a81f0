//! Citation resolution against a YAML bibliography.
//!
//! Citations are written as `[@key]` or `[@first; @second]` in prose. Each
//! one renders as an author-year link to the reference list appended to the
//! end of the document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event};
use regex::Regex;
use serde::Deserialize;

use super::highlight::html_escape;

static CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(@[\w:.#$%&+?<>~/-]+(?:\s*;\s*@[\w:.#$%&+?<>~/-]+)*)\]")
        .expect("citation pattern is valid")
});

#[derive(thiserror::Error, Debug)]
pub enum CitationError {
    #[error("failed to read bibliography {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid bibliography {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unknown citation key '{0}'")]
    UnknownKey(String),

    #[error("citation [@{0}] found but no bibliography is configured")]
    NoBibliography(String),
}

/// A single bibliography record.
#[derive(Debug, Clone, Deserialize)]
pub struct Reference {
    pub author: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Reference {
    /// Short in-text label, e.g. "Knuth, 1984".
    fn label(&self) -> String {
        let surname = self
            .author
            .split([',', '&'])
            .next()
            .unwrap_or(&self.author)
            .trim();
        match self.year {
            Some(year) => format!("{surname}, {year}"),
            None => format!("{surname}, n.d."),
        }
    }
}

/// Citation key to reference map, loaded once per build.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Bibliography {
    entries: BTreeMap<String, Reference>,
}

impl Bibliography {
    pub fn load(path: &Path) -> Result<Self, CitationError> {
        let content = std::fs::read_to_string(path).map_err(|source| CitationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| CitationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Reference> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Per-document citation state: which keys were cited, in first-use order.
pub struct Citations<'a> {
    bibliography: Option<&'a Bibliography>,
    cited: Vec<String>,
}

impl<'a> Citations<'a> {
    pub fn new(bibliography: Option<&'a Bibliography>) -> Self {
        Self {
            bibliography,
            cited: Vec::new(),
        }
    }

    /// Replace the citations in a text run. Returns `None` if it has none.
    pub fn rewrite<'e>(&mut self, text: &str) -> Result<Option<Vec<Event<'e>>>, CitationError> {
        if !CITATION.is_match(text) {
            return Ok(None);
        }

        let mut events = Vec::new();
        let mut last = 0;
        for caps in CITATION.captures_iter(text) {
            let (Some(whole), Some(keys)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                events.push(Event::Text(CowStr::from(text[last..whole.start()].to_string())));
            }
            events.push(Event::InlineHtml(CowStr::from(self.render(keys.as_str())?)));
            last = whole.end();
        }
        if last < text.len() {
            events.push(Event::Text(CowStr::from(text[last..].to_string())));
        }
        Ok(Some(events))
    }

    fn render(&mut self, keys: &str) -> Result<String, CitationError> {
        let links = keys
            .split(';')
            .map(|key| key.trim().trim_start_matches('@'))
            .map(|key| {
                let bibliography = self
                    .bibliography
                    .ok_or_else(|| CitationError::NoBibliography(key.to_string()))?;
                let reference = bibliography
                    .get(key)
                    .ok_or_else(|| CitationError::UnknownKey(key.to_string()))?;
                if !self.cited.iter().any(|k| k == key) {
                    self.cited.push(key.to_string());
                }
                Ok(format!(
                    "<a class=\"citation\" href=\"#ref-{}\">{}</a>",
                    html_escape(key),
                    html_escape(&reference.label())
                ))
            })
            .collect::<Result<Vec<_>, CitationError>>()?;
        Ok(format!("({})", links.join("; ")))
    }

    /// Reference list for every cited key, or `None` if nothing was cited.
    pub fn references_html(&self) -> Option<String> {
        let bibliography = self.bibliography?;
        if self.cited.is_empty() {
            return None;
        }

        let mut html = String::from("<section class=\"references\"><ol>");
        for key in &self.cited {
            let Some(reference) = bibliography.get(key) else {
                continue;
            };
            let title = match &reference.url {
                Some(url) => format!(
                    "<a href=\"{}\">{}</a>",
                    html_escape(url),
                    html_escape(&reference.title)
                ),
                None => html_escape(&reference.title),
            };
            let year = reference
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "n.d.".to_string());
            html.push_str(&format!(
                "<li id=\"ref-{}\">{} ({}). {}.",
                html_escape(key),
                html_escape(&reference.author),
                year,
                title
            ));
            if let Some(container) = &reference.container {
                html.push_str(&format!(" <em>{}</em>.", html_escape(container)));
            }
            html.push_str("</li>");
        }
        html.push_str("</ol></section>");
        Some(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bibliography() -> Bibliography {
        serde_yaml::from_str(
            r#"
knuth1984:
  author: Knuth, Donald
  title: Literate Programming
  year: 1984
  container: The Computer Journal
lamport:
  author: Lamport, Leslie
  title: Time, Clocks, and the Ordering of Events
  year: 1978
  url: https://example.com/clocks.pdf
"#,
        )
        .unwrap()
    }

    fn html(events: &[Event<'_>]) -> String {
        let mut out = String::new();
        pulldown_cmark::html::push_html(&mut out, events.iter().cloned());
        out
    }

    #[test]
    fn test_text_without_citations_is_untouched() {
        let bib = bibliography();
        let mut citations = Citations::new(Some(&bib));
        assert!(citations.rewrite("plain [link] text").unwrap().is_none());
        assert!(citations.references_html().is_none());
    }

    #[test]
    fn test_single_citation() {
        let bib = bibliography();
        let mut citations = Citations::new(Some(&bib));
        let events = citations.rewrite("As shown [@knuth1984], code <is> prose.").unwrap().unwrap();
        let out = html(&events);
        assert_eq!(
            out,
            "As shown (<a class=\"citation\" href=\"#ref-knuth1984\">Knuth, 1984</a>), code &lt;is&gt; prose."
        );

        let refs = citations.references_html().unwrap();
        assert!(refs.contains("<li id=\"ref-knuth1984\">Knuth, Donald (1984). Literate Programming. <em>The Computer Journal</em>.</li>"));
    }

    #[test]
    fn test_multiple_keys_keep_first_use_order() {
        let bib = bibliography();
        let mut citations = Citations::new(Some(&bib));
        citations.rewrite("[@lamport; @knuth1984]").unwrap();
        citations.rewrite("again [@lamport]").unwrap();

        let refs = citations.references_html().unwrap();
        let lamport = refs.find("ref-lamport").unwrap();
        let knuth = refs.find("ref-knuth1984").unwrap();
        assert!(lamport < knuth);
        assert_eq!(refs.matches("<li").count(), 2);
        assert!(refs.contains("<a href=\"https://example.com/clocks.pdf\">"));
    }

    #[test]
    fn test_unknown_key_fails() {
        let bib = bibliography();
        let mut citations = Citations::new(Some(&bib));
        let err = citations.rewrite("see [@missing]").unwrap_err();
        assert!(matches!(err, CitationError::UnknownKey(key) if key == "missing"));
    }

    #[test]
    fn test_citation_without_bibliography_fails() {
        let mut citations = Citations::new(None);
        let err = citations.rewrite("see [@knuth1984]").unwrap_err();
        assert!(matches!(err, CitationError::NoBibliography(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.yaml");
        std::fs::write(&path, "a:\n  author: A\n  title: T\n").unwrap();
        let bib = Bibliography::load(&path).unwrap();
        assert_eq!(bib.len(), 1);
        assert_eq!(bib.get("a").unwrap().label(), "A, n.d.");
    }
}
