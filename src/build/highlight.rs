use autumnus::{HtmlLinkedBuilder, formatter::Formatter, languages::Language, themes};
use tracing::debug;

/// A syntax highlighter using autumnus (tree-sitter based).
pub struct SyntaxHighlighter {
    theme_name: String,
}

/// A parsed code fence info string such as `rust` or `js:src/index.js`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceInfo {
    pub language: String,
    pub title: Option<String>,
}

impl FenceInfo {
    pub fn parse(info: &str) -> Self {
        let first = info.split_whitespace().next().unwrap_or_default();
        match first.split_once(':') {
            Some((language, title)) if !title.is_empty() => Self {
                language: language.to_string(),
                title: Some(title.to_string()),
            },
            Some((language, _)) => Self {
                language: language.to_string(),
                title: None,
            },
            None => Self {
                language: first.to_string(),
                title: None,
            },
        }
    }
}

impl SyntaxHighlighter {
    /// Create a new syntax highlighter with the given theme.
    pub fn new(theme_name: &str) -> Self {
        Self {
            theme_name: theme_name.to_string(),
        }
    }

    /// Highlight a fenced code block, adding a title bar for `lang:title` fences.
    pub fn highlight_fence(&self, code: &str, info: &str) -> String {
        let fence = FenceInfo::parse(info);
        let block = self.highlight(code, &fence.language);
        match fence.title {
            Some(title) => format!(
                "<div class=\"code-title\">{}</div>{}",
                html_escape(&title),
                block
            ),
            None => block,
        }
    }

    /// Highlight code and return HTML with CSS classes.
    /// Returns the original code wrapped in a plain `<code>` if the language is not supported.
    pub fn highlight(&self, code: &str, language: &str) -> String {
        let lang = Language::guess(language, code);

        if matches!(lang, Language::PlainText)
            && !language.is_empty()
            && language != "plaintext"
            && language != "text"
        {
            debug!(language, "no grammar for code fence, leaving it unhighlighted");
            return plain_code_block(code, language);
        }

        let formatter = HtmlLinkedBuilder::new().source(code).lang(lang).build();

        match formatter {
            Ok(f) => {
                let mut output: Vec<u8> = Vec::new();
                if f.format(&mut output).is_ok() {
                    String::from_utf8(output).unwrap_or_else(|_| plain_code_block(code, language))
                } else {
                    plain_code_block(code, language)
                }
            }
            Err(_) => plain_code_block(code, language),
        }
    }

    /// Stylesheet for the configured theme, written next to the pages.
    pub fn generate_css(&self) -> Option<String> {
        let theme = themes::get(&self.theme_name).ok()?;
        Some(theme.css(false))
    }
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new("github-dark")
    }
}

/// A code block without highlighting.
pub fn plain_code_block(code: &str, language: &str) -> String {
    let escaped = html_escape(code);
    if language.is_empty() {
        format!("<pre><code>{escaped}</code></pre>")
    } else {
        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            html_escape(language),
            escaped
        )
    }
}

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
