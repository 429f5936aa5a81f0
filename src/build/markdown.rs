//! Markdown rendering through the ordered plugin chain.
//!
//! Plugins are named in configuration but always run in the order of the
//! [`Plugin`] enum: parser extensions (gfm, math) first, then citations and
//! math rendering on prose, code highlighting, heading slugs, heading
//! autolinks and finally minification.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

use pulldown_cmark::{
    CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, TextMergeStream,
    html,
};

use super::citation::{Bibliography, CitationError, Citations};
use super::highlight::{FenceInfo, SyntaxHighlighter, html_escape, plain_code_block};
use super::paths::Slugger;
use super::toc::{HeadingText, TocEntry, collect_toc, heading_anchor};
use crate::config::MarkdownConfig;

static KATEX_INLINE_OPTS: LazyLock<katex::Opts> = LazyLock::new(|| {
    katex::Opts::builder()
        .display_mode(false)
        .build()
        .expect("static katex options")
});

static KATEX_DISPLAY_OPTS: LazyLock<katex::Opts> = LazyLock::new(|| {
    katex::Opts::builder()
        .display_mode(true)
        .build()
        .expect("static katex options")
});

#[derive(thiserror::Error, Debug)]
pub enum MarkdownError {
    #[error("invalid markdown extension: {0}")]
    InvalidExtension(String),

    #[error("unknown markdown plugin: {0}")]
    UnknownPlugin(String),

    #[error("failed to render math `{tex}`: {message}")]
    Math { tex: String, message: String },

    #[error(transparent)]
    Citation(#[from] CitationError),
}

// =============================================================================
// Plugins
// =============================================================================

/// A transform in the compile chain. Declaration order is application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Plugin {
    Gfm,
    Math,
    Citation,
    Highlight,
    Slug,
    AutolinkHeadings,
    Minify,
}

impl FromStr for Plugin {
    type Err = MarkdownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "gfm" => Plugin::Gfm,
            "math" => Plugin::Math,
            "citation" => Plugin::Citation,
            "highlight" => Plugin::Highlight,
            "slug" => Plugin::Slug,
            "autolink_headings" => Plugin::AutolinkHeadings,
            "minify" => Plugin::Minify,
            other => return Err(MarkdownError::UnknownPlugin(other.to_string())),
        })
    }
}

/// Parser options and enabled plugins, resolved once from configuration.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    options: Options,
    plugins: BTreeSet<Plugin>,
}

impl MarkdownOptions {
    pub fn from_config(config: &MarkdownConfig) -> Result<Self, MarkdownError> {
        let plugins = config
            .plugins
            .iter()
            .map(|name| name.parse())
            .collect::<Result<BTreeSet<Plugin>, _>>()?;

        let mut options = Options::empty();
        for extension in &config.extensions {
            match extension.as_str() {
                "definition_lists" => options.insert(Options::ENABLE_DEFINITION_LIST),
                "footnotes" => options.insert(Options::ENABLE_FOOTNOTES),
                "gfm" => options.insert(Options::ENABLE_GFM),
                "heading_attributes" => options.insert(Options::ENABLE_HEADING_ATTRIBUTES),
                "strikethrough" => options.insert(Options::ENABLE_STRIKETHROUGH),
                "tables" => options.insert(Options::ENABLE_TABLES),
                "tasklists" => options.insert(Options::ENABLE_TASKLISTS),
                other => return Err(MarkdownError::InvalidExtension(other.to_string())),
            }
        }
        if plugins.contains(&Plugin::Gfm) {
            options.insert(
                Options::ENABLE_GFM
                    | Options::ENABLE_TABLES
                    | Options::ENABLE_STRIKETHROUGH
                    | Options::ENABLE_TASKLISTS
                    | Options::ENABLE_FOOTNOTES,
            );
        }
        if plugins.contains(&Plugin::Math) {
            options.insert(Options::ENABLE_MATH);
        }

        Ok(Self { options, plugins })
    }

    pub fn parser_options(&self) -> Options {
        self.options
    }

    pub fn enabled(&self, plugin: Plugin) -> bool {
        self.plugins.contains(&plugin)
    }

    /// Enabled plugins in application order.
    pub fn plugins(&self) -> impl Iterator<Item = Plugin> + '_ {
        self.plugins.iter().copied()
    }
}

/// Everything the renderer needs that outlives a single document.
pub struct MarkdownContext<'a> {
    pub options: &'a MarkdownOptions,
    pub highlighter: &'a SyntaxHighlighter,
    pub bibliography: Option<&'a Bibliography>,
}

/// Result of rendering markdown, containing both HTML and table of contents.
#[derive(Debug)]
pub struct MarkdownOutput {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

// =============================================================================
// Rendering
// =============================================================================

struct HeadingState {
    level: HeadingLevel,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    text: HeadingText,
    inner: Vec<Event<'static>>,
}

/// Render a markdown body to HTML and collect its table of contents.
pub fn render_markdown(
    markdown: &str,
    ctx: &MarkdownContext<'_>,
) -> Result<MarkdownOutput, MarkdownError> {
    let options = ctx.options;
    let parser = TextMergeStream::new(Parser::new_ext(markdown, options.parser_options()));

    let mut citations = Citations::new(ctx.bibliography);
    let mut slugger = Slugger::new();
    // Whether each heading, in document order, was given an id
    let mut anchored: Vec<bool> = Vec::new();

    let mut code_block: Option<(String, String)> = None;
    let mut heading: Option<HeadingState> = None;
    let mut events: Vec<Event<'static>> = Vec::new();

    for event in parser {
        // Code block content is never rewritten by the prose passes
        if let Some((info, code)) = code_block.as_mut() {
            match event {
                Event::Text(text) => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    let html = if options.enabled(Plugin::Highlight) {
                        ctx.highlighter.highlight_fence(code, info)
                    } else {
                        plain_code_block(code, &FenceInfo::parse(info).language)
                    };
                    events.push(Event::Html(CowStr::from(html)));
                    code_block = None;
                }
                _ => {}
            }
            continue;
        }

        let rewritten: Vec<Event<'static>> = match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                code_block = Some((info, String::new()));
                continue;
            }
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                heading = Some(HeadingState {
                    level,
                    id: id.map(|id| id.to_string()),
                    classes: classes.iter().map(|c| c.to_string()).collect(),
                    attrs: attrs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.as_ref().map(|v| v.to_string())))
                        .collect(),
                    text: HeadingText::default(),
                    inner: Vec::new(),
                });
                continue;
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some(state) = heading.take() else {
                    continue;
                };
                let (html, has_id) = finish_heading(state, options, &mut slugger);
                anchored.push(has_id);
                events.push(html);
                continue;
            }
            Event::Text(text) => {
                if let Some(state) = heading.as_mut() {
                    state.text.push(&Event::Text(text.clone()));
                }
                if options.enabled(Plugin::Citation) {
                    match citations.rewrite(&text)? {
                        Some(parts) => parts,
                        None => vec![Event::Text(CowStr::from(text.to_string()))],
                    }
                } else {
                    vec![Event::Text(CowStr::from(text.to_string()))]
                }
            }
            Event::InlineMath(tex) => {
                if let Some(state) = heading.as_mut() {
                    state.text.push(&Event::InlineMath(tex.clone()));
                }
                vec![Event::InlineHtml(CowStr::from(render_math(&tex, false)?))]
            }
            Event::DisplayMath(tex) => {
                vec![Event::InlineHtml(CowStr::from(render_math(&tex, true)?))]
            }
            other => {
                if let Some(state) = heading.as_mut() {
                    state.text.push(&other);
                }
                vec![other.into_static()]
            }
        };

        match heading.as_mut() {
            Some(state) => state.inner.extend(rewritten),
            None => events.extend(rewritten),
        }
    }

    if let Some(references) = citations.references_html() {
        events.push(Event::Html(CowStr::from(references)));
    }

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    if options.enabled(Plugin::Minify) {
        html_output = minify(&html_output);
    }

    // Only headings with an id can be linked from the table of contents.
    let toc = collect_toc(markdown, options.parser_options())
        .into_iter()
        .zip(anchored)
        .filter_map(|(entry, has_id)| has_id.then_some(entry))
        .collect();

    Ok(MarkdownOutput {
        html: html_output,
        toc,
    })
}

/// Emit a buffered heading with its anchor and permalink, and whether it
/// got an id.
fn finish_heading(
    state: HeadingState,
    options: &MarkdownOptions,
    slugger: &mut Slugger,
) -> (Event<'static>, bool) {
    let level = state.level as usize;
    let text = state.text.into_string();

    let id = if options.enabled(Plugin::Slug) || state.id.is_some() {
        Some(heading_anchor(slugger, state.id.as_deref(), &text))
    } else {
        None
    };

    let mut inner = String::new();
    html::push_html(&mut inner, state.inner.into_iter());

    let mut open = format!("<h{level}");
    if let Some(id) = &id {
        open.push_str(&format!(" id=\"{}\"", html_escape(id)));
    }
    if !state.classes.is_empty() {
        open.push_str(&format!(" class=\"{}\"", html_escape(&state.classes.join(" "))));
    }
    for (key, value) in &state.attrs {
        match value {
            Some(value) => open.push_str(&format!(" {}=\"{}\"", key, html_escape(value))),
            None => open.push_str(&format!(" {key}")),
        }
    }
    open.push('>');

    let permalink = match (&id, options.enabled(Plugin::AutolinkHeadings)) {
        (Some(id), true) => format!(
            "<a class=\"header-anchor\" href=\"#{}\" aria-label=\"Link to this heading\">#</a>",
            html_escape(id)
        ),
        _ => String::new(),
    };

    let html = Event::Html(CowStr::from(format!(
        "{open}{}{permalink}</h{level}>\n",
        inner.trim_end()
    )));
    (html, id.is_some())
}

fn render_math(tex: &str, display: bool) -> Result<String, MarkdownError> {
    let opts = if display {
        &*KATEX_DISPLAY_OPTS
    } else {
        &*KATEX_INLINE_OPTS
    };
    katex::render_with_opts(tex, opts).map_err(|e| MarkdownError::Math {
        tex: tex.to_string(),
        message: e.to_string(),
    })
}

/// Minify an HTML fragment.
pub fn minify(html: &str) -> String {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    String::from_utf8_lossy(&minify_html::minify(html.as_bytes(), &cfg)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(plugins: &[&str]) -> MarkdownOptions {
        MarkdownOptions::from_config(&MarkdownConfig {
            plugins: plugins.iter().map(|p| p.to_string()).collect(),
            ..MarkdownConfig::default()
        })
        .unwrap()
    }

    fn render(markdown: &str, options: &MarkdownOptions) -> MarkdownOutput {
        let highlighter = SyntaxHighlighter::default();
        let ctx = MarkdownContext {
            options,
            highlighter: &highlighter,
            bibliography: None,
        };
        render_markdown(markdown, &ctx).unwrap()
    }

    #[test]
    fn test_render_basic_markdown() {
        let output = render("# Hello\n\nWorld", &options(&["slug"]));
        assert!(output.html.contains("<h1 id=\"hello\">Hello</h1>"));
        assert!(output.html.contains("<p>World</p>"));
        assert_eq!(output.toc.len(), 1);
        assert_eq!(output.toc[0].text, "Hello");
        assert_eq!(output.toc[0].depth, 1);
    }

    #[test]
    fn test_heading_anchors_match_toc() {
        let markdown = "## Setup\n\ntext\n\n## Install *it*\n\n## Setup\n\n### Setup 1\n";
        let output = render(markdown, &options(&["slug", "autolink_headings"]));

        for entry in &output.toc {
            assert!(
                output.html.contains(&format!("id=\"{}\"", entry.anchor)),
                "missing anchor {}",
                entry.anchor
            );
        }
        let anchors: Vec<_> = output.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["setup", "install-it", "setup-1", "setup-1-1"]);
        assert!(output.html.contains("<h2 id=\"setup-1\">Setup<a class=\"header-anchor\" href=\"#setup-1\""));
    }

    #[test]
    fn test_no_ids_without_slug_plugin() {
        let output = render("## Plain\n", &options(&[]));
        assert!(output.html.contains("<h2>Plain</h2>"));
        assert!(output.toc.is_empty());
    }

    #[test]
    fn test_toc_lists_only_anchored_headings() {
        let output = render("## Setup\n\ntext\n\n## Intro {#start}\n", &options(&["gfm"]));
        let anchors: Vec<_> = output.toc.iter().map(|e| e.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["start"]);
        assert!(!output.html.contains("id=\"setup\""));
        for entry in &output.toc {
            assert!(output.html.contains(&format!("id=\"{}\"", entry.anchor)));
        }
    }

    #[test]
    fn test_explicit_heading_id() {
        let output = render("## Intro {#start}\n", &options(&[]));
        assert!(output.html.contains("<h2 id=\"start\">Intro</h2>"));
        assert_eq!(output.toc[0].anchor, "start");
    }

    #[test]
    fn test_render_code_block() {
        let output = render("```rust\nlet x = 1;\n```", &options(&["highlight"]));
        assert!(output.html.contains("let"));
        assert!(output.html.contains("<pre"));
    }

    #[test]
    fn test_plain_code_block_without_highlight() {
        let output = render("```rust\nlet x = a < b;\n```", &options(&[]));
        assert!(output.html.contains("<pre><code class=\"language-rust\">let x = a &lt; b;\n</code></pre>"));
    }

    #[test]
    fn test_math_renders_outside_code_only() {
        let output = render(
            "Inline $x^2$ here.\n\n```\n$x^2$\n```\n\nAnd `$y$`.",
            &options(&["math"]),
        );
        assert!(output.html.contains("katex"));
        assert!(output.html.contains("<pre><code>$x^2$\n</code></pre>"));
        assert!(output.html.contains("<code>$y$</code>"));
    }

    #[test]
    fn test_invalid_math_fails_document() {
        let highlighter = SyntaxHighlighter::default();
        let opts = options(&["math"]);
        let ctx = MarkdownContext {
            options: &opts,
            highlighter: &highlighter,
            bibliography: None,
        };
        let err = render_markdown("Broken $\\notacommand{x}$ math", &ctx).unwrap_err();
        assert!(matches!(err, MarkdownError::Math { .. }));
    }

    #[test]
    fn test_citations_resolve_and_skip_code() {
        let bibliography: Bibliography =
            serde_yaml::from_str("doe:\n  author: Doe, J\n  title: On Things\n  year: 2020\n")
                .unwrap();
        let highlighter = SyntaxHighlighter::default();
        let opts = options(&["citation"]);
        let ctx = MarkdownContext {
            options: &opts,
            highlighter: &highlighter,
            bibliography: Some(&bibliography),
        };

        let output =
            render_markdown("Known [@doe].\n\n```\n[@doe]\n```\n", &ctx).unwrap();
        assert!(output.html.contains("<a class=\"citation\" href=\"#ref-doe\">Doe, 2020</a>"));
        assert!(output.html.contains("<pre><code>[@doe]\n</code></pre>"));
        assert!(output.html.contains("<section class=\"references\">"));

        let err = render_markdown("Unknown [@nobody].", &ctx).unwrap_err();
        assert!(matches!(err, MarkdownError::Citation(CitationError::UnknownKey(_))));
    }

    #[test]
    fn test_gfm_plugin_enables_tables() {
        let output = render("| a | b |\n|---|---|\n| 1 | 2 |\n", &options(&["gfm"]));
        assert!(output.html.contains("<table>"));
    }

    #[test]
    fn test_minify_plugin() {
        let markdown = "# Title\n\n\n\nSome   text\n\n- one\n- two\n";
        let plain = render(markdown, &options(&[]));
        let minified = render(markdown, &options(&["minify"]));
        assert!(minified.html.len() < plain.html.len());
        assert!(minified.html.contains("Title"));
        assert!(minified.html.contains("two"));
    }

    #[test]
    fn test_plugin_order_is_fixed() {
        let opts = options(&["minify", "slug", "gfm", "highlight"]);
        let order: Vec<_> = opts.plugins().collect();
        assert_eq!(
            order,
            vec![Plugin::Gfm, Plugin::Highlight, Plugin::Slug, Plugin::Minify]
        );
    }

    #[test]
    fn test_unknown_plugin() {
        let err = MarkdownOptions::from_config(&MarkdownConfig {
            plugins: vec!["mermaid".to_string()],
            ..MarkdownConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, MarkdownError::UnknownPlugin(name) if name == "mermaid"));
    }

    #[test]
    fn test_invalid_extension() {
        let err = MarkdownOptions::from_config(&MarkdownConfig {
            extensions: vec!["not_a_real_extension".to_string()],
            ..MarkdownConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, MarkdownError::InvalidExtension(_)));
    }
}
