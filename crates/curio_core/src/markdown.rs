//! Markdown rendering and HTML shaping for post bodies.
//!
//! # Responsibility
//! - Render user markdown to HTML and sanitize it in one step.
//! - Derive the tag-stripped summary stored on question rows.
//!
//! # Invariants
//! - Rendered HTML is always passed through the sanitizer before it is
//!   persisted or returned to callers.
//! - Summaries contain no markup and at most [`SUMMARY_MAX_CHARS`] chars.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

/// Maximum characters kept in a question summary.
pub const SUMMARY_MAX_CHARS: usize = 180;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Renders markdown to sanitized HTML.
pub fn render_markdown(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(text, options);
    let mut rendered = String::new();
    html::push_html(&mut rendered, parser);

    ammonia::clean(&rendered)
}

/// Removes all markup from an HTML fragment, keeping text content.
pub fn strip_tags(html: &str) -> String {
    ammonia::Builder::empty().clean(html).to_string()
}

/// Derives the plain-text summary stored on question rows: markup
/// stripped, whitespace collapsed, capped at [`SUMMARY_MAX_CHARS`].
pub fn summarize(html: &str) -> String {
    let stripped = strip_tags(html);
    let collapsed = WHITESPACE_RE.replace_all(&stripped, " ");
    collapsed.trim().chars().take(SUMMARY_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::{render_markdown, strip_tags, summarize, SUMMARY_MAX_CHARS};

    #[test]
    fn render_markdown_produces_sanitized_html() {
        let html = render_markdown("**bold** and <script>alert(1)</script>");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn strip_tags_keeps_text_content() {
        assert_eq!(strip_tags("<p>a <em>b</em></p>").trim(), "a b");
    }

    #[test]
    fn summarize_collapses_whitespace_and_caps_length() {
        let long_body = "word ".repeat(100);
        let summary = summarize(&render_markdown(&long_body));
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS);
        assert!(!summary.contains('\n'));
    }
}
