//! Markdown to HTML for the result panel.
//!
//! Model output is rendered with GitHub Flavored extensions. Raw HTML blocks
//! are shown as text so a transcription can never inject markup.

use pulldown_cmark::{html, Event, Options, Parser};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options()).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_list_item() {
        let html = render_markdown("# Title\n\n- item");
        assert!(html.contains("<h1>Title</h1>"), "got: {}", html);
        assert_eq!(html.matches("<li>").count(), 1);
        assert!(html.contains("<li>item</li>"), "got: {}", html);
    }

    #[test]
    fn test_gfm_table() {
        let md = "| Name | Qty |\n|------|-----|\n| Bolt | 4 |\n";
        let html = render_markdown(md);
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Name</th>"));
        assert!(html.contains("<td>Bolt</td>"));
    }

    #[test]
    fn test_strikethrough_and_tasks() {
        let html = render_markdown("~~old~~\n\n- [x] done");
        assert!(html.contains("<del>old</del>"));
        assert!(html.contains("checkbox"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markdown("<script>alert(1)</script>\n");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(render_markdown(""), "");
    }
}
