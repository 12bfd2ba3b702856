//! HTML to readable text
//!
//! Title comes from `<title>`. Content is a depth-first walk of the body that
//! skips non-content subtrees, keeps text, and ends every block element with
//! a blank line. A final pass trims lines and folds repeated blank lines.

use ego_tree::NodeRef;
use scraper::{Html, Node, Selector};
use std::sync::LazyLock;
use thiserror::Error;

use crate::utils::collapse_whitespace;

#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("cannot extract content from an empty document")]
    EmptyDocument,
}

/// Elements removed with everything inside them
const SKIPPED_ELEMENTS: &[&str] = &[
    "head", "script", "style", "meta", "link", "noscript", "template", "nav", "header", "footer",
    "aside", "iframe",
];

/// Elements followed by a blank line
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "tr", "th", "td",
];

static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("title").expect("BUG: hardcoded CSS selector 'title' is invalid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub content: String,
}

/// Extract the title and cleaned text of `html`
///
/// Content may be empty for pages that are all script; callers decide what
/// to fall back to.
pub fn extract(html: &str) -> Result<ExtractedContent, ExtractError> {
    if html.trim().is_empty() {
        return Err(ExtractError::EmptyDocument);
    }

    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .unwrap_or_default();

    let mut raw = String::with_capacity(html.len() / 4);
    walk(document.tree.root(), &mut raw);

    Ok(ExtractedContent {
        title,
        content: normalize_blocks(&raw),
    })
}

fn walk(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => push_text(text, out),
        Node::Element(element) => {
            let name = element.name();
            if SKIPPED_ELEMENTS.contains(&name) {
                return;
            }
            for child in node.children() {
                walk(child, out);
            }
            if BLOCK_ELEMENTS.contains(&name) {
                out.push_str("\n\n");
            }
        }
        Node::Document | Node::Fragment => {
            for child in node.children() {
                walk(child, out);
            }
        }
        _ => {}
    }
}

/// Append a text node with its whitespace runs collapsed to single spaces
fn push_text(text: &str, out: &mut String) {
    let core = collapse_whitespace(text);
    if core.is_empty() {
        if !text.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        return;
    }
    if text.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&core);
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

/// Trim each line and keep at most one blank line between paragraphs
fn normalize_blocks(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_blank = false;

    for line in raw.lines() {
        let line = collapse_whitespace(line);
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
            if pending_blank {
                out.push('\n');
            }
        }
        out.push_str(&line);
        pending_blank = false;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_scripts_and_navigation() {
        let html = r#"<html><head><title> Example  Page </title><style>p{color:red}</style></head>
            <body>
              <nav><a href="/">Home</a> <a href="/about">About</a></nav>
              <script>var secret = "do not show";</script>
              <p>First paragraph with <b>bold</b> text.</p>
              <p>Second   paragraph.</p>
            </body></html>"#;

        let extracted = extract(html).expect("extracted");
        assert_eq!(extracted.title, "Example Page");
        assert_eq!(
            extracted.content,
            "First paragraph with bold text.\n\nSecond paragraph."
        );
    }

    #[test]
    fn blocks_are_separated_by_one_blank_line() {
        let html = "<body><h1>Title</h1><div><div><p>Nested</p></div></div>\
                    <ul><li>one</li><li>two</li></ul>line<br>break</body>";
        let extracted = extract(html).expect("extracted");
        assert_eq!(extracted.content, "Title\n\nNested\n\none\n\ntwo\n\nline\n\nbreak");
    }

    #[test]
    fn script_only_page_has_empty_content() {
        let extracted = extract("<html><body><script>app()</script></body></html>").expect("ok");
        assert_eq!(extracted.content, "");
        assert_eq!(extracted.title, "");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(extract("  \n "), Err(ExtractError::EmptyDocument)));
    }
}
