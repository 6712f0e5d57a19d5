//! Readable-text extraction from article HTML.
//!
//! Finds the main content container, prefers paragraph and heading text inside
//! it, and falls back to every visible text node when a page has no paragraphs.

use crate::rss_utils::text::truncate_chars;
use scraper::{ElementRef, Html, Selector};

const CONTAINERS: [&str; 4] = ["article", "main", r#"[role="main"]"#, "body"];
const BLOCKS: &str = "p, h1, h2, h3, h4, pre";
const SKIPPED: [&str; 8] = [
    "script", "style", "noscript", "nav", "header", "footer", "aside", "template",
];

pub fn extract_readable_text(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);
    let text = main_container(&document)
        .map(|container| container_text(&container))
        .unwrap_or_default();
    truncate_chars(&text, max_chars)
}

fn main_container(document: &Html) -> Option<ElementRef<'_>> {
    CONTAINERS.iter().find_map(|css| {
        Selector::parse(css)
            .ok()
            .and_then(|selector| document.select(&selector).next())
    })
}

fn container_text(container: &ElementRef<'_>) -> String {
    let from_blocks = Selector::parse(BLOCKS)
        .map(|selector| {
            container
                .select(&selector)
                .filter(|el| !is_skipped(el))
                .map(|el| collapse(&el.text().collect::<Vec<_>>().join(" ")))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    if !from_blocks.is_empty() {
        return from_blocks;
    }

    let visible: Vec<&str> = container
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED.contains(&e.name()))
            });
            if hidden {
                None
            } else {
                Some(&**text)
            }
        })
        .collect();
    collapse(&visible.join(" "))
}

fn is_skipped(el: &ElementRef<'_>) -> bool {
    el.ancestors().any(|a| {
        a.value()
            .as_element()
            .is_some_and(|e| SKIPPED.contains(&e.name()))
    })
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_paragraphs() {
        let html = r#"<html><head><title>t</title><script>var x = 1;</script></head>
            <body><nav><p>Menu</p></nav>
            <article><h1>Headline</h1><p>First   paragraph.</p><p>Second paragraph.</p></article>
            <footer><p>Copyright</p></footer></body></html>"#;
        assert_eq!(extract_readable_text(html, 500), "Headline First paragraph. Second paragraph.");
    }

    #[test]
    fn falls_back_to_visible_text() {
        let html = r#"<html><body><div>Plain <span>text</span> page</div><script>ignored()</script></body></html>"#;
        assert_eq!(extract_readable_text(html, 500), "Plain text page");
    }

    #[test]
    fn skips_paragraphs_inside_navigation() {
        let html = r#"<html><body><header><p>Site name</p></header><p>Body text</p></body></html>"#;
        assert_eq!(extract_readable_text(html, 500), "Body text");
    }

    #[test]
    fn truncates_long_text() {
        let html = format!("<html><body><p>{}</p></body></html>", "a".repeat(600));
        let text = extract_readable_text(&html, 500);
        assert_eq!(text.chars().count(), 503);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn empty_page_yields_empty_text() {
        assert!(extract_readable_text("", 500).is_empty());
    }
}
