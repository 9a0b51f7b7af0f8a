//! Markdown rendering for product descriptions.
//!
//! The raw markdown source is kept verbatim on the product row; this
//! module produces the sanitized HTML stored alongside it. Rendering
//! happens whenever `description` is set or changed.

use pulldown_cmark::{Options, Parser, html};

/// Renders markdown to sanitized HTML.
///
/// Sanitization runs after rendering so raw HTML embedded in the source
/// passes through the same filter as generated markup.
pub fn render_markdown(source: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(source, options);
    let mut raw_html = String::new();
    html::push_html(&mut raw_html, parser);

    ammonia::clean(&raw_html)
}

#[cfg(test)]
mod tests {
    use super::render_markdown;

    #[test]
    fn test_renders_basic_markdown() {
        let html = render_markdown("# Title\n\nSome **bold** text.");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_strips_script_tags() {
        let html = render_markdown("hello <script>alert('x')</script> world");
        assert!(!html.contains("<script>"));
        assert!(html.contains("hello"));
        assert!(html.contains("world"));
    }

    #[test]
    fn test_keeps_links_without_event_handlers() {
        let html = render_markdown("[shop](https://example.com) <a href=\"#\" onclick=\"x()\">bad</a>");
        assert!(html.contains("href=\"https://example.com\""));
        assert!(!html.contains("onclick"));
    }

    #[test]
    fn test_empty_source_renders_empty() {
        assert_eq!(render_markdown(""), "");
    }
}
