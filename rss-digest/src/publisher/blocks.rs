//! Markdown → Feishu docx block conversion.
//!
//! Line oriented: each non-blank line becomes one block. Inline `**bold**`,
//! `*italic*` and `[text](url)` turn into styled text runs, and a backslash
//! before punctuation makes it literal.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Map, Value};

const TEXT: u8 = 2;
const HEADING1: u8 = 3;
const HEADING2: u8 = 4;
const HEADING3: u8 = 5;
const BULLET: u8 = 12;
const QUOTE: u8 = 15;
const DIVIDER: u8 = 22;

/// Everything but RFC 3986 unreserved characters.
const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Clone, Default, PartialEq)]
struct Run {
    content: String,
    bold: bool,
    italic: bool,
    link: Option<String>,
}

pub fn markdown_to_blocks(markdown: &str) -> Vec<Value> {
    markdown
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(line_to_block)
        .collect()
}

fn line_to_block(line: &str) -> Value {
    if line.starts_with("---") && line.chars().all(|c| c == '-') {
        return json!({ "block_type": DIVIDER, "divider": {} });
    }

    let (block_type, key, rest) = if let Some(rest) = line.strip_prefix("### ") {
        (HEADING3, "heading3", rest)
    } else if let Some(rest) = line.strip_prefix("## ") {
        (HEADING2, "heading2", rest)
    } else if let Some(rest) = line.strip_prefix("# ") {
        (HEADING1, "heading1", rest)
    } else if let Some(rest) = line.strip_prefix("- ") {
        (BULLET, "bullet", rest)
    } else if let Some(rest) = line.strip_prefix("> ") {
        (QUOTE, "quote", rest)
    } else {
        (TEXT, "text", line)
    };

    let elements: Vec<Value> = parse_inline(rest).into_iter().map(run_to_element).collect();

    let mut block = Map::new();
    block.insert("block_type".into(), json!(block_type));
    block.insert(key.into(), json!({ "elements": elements }));
    Value::Object(block)
}

fn run_to_element(run: Run) -> Value {
    let mut style = Map::new();
    if run.bold {
        style.insert("bold".into(), json!(true));
    }
    if run.italic {
        style.insert("italic".into(), json!(true));
    }
    if let Some(url) = run.link {
        // Link URLs must be percent-encoded for the docx API.
        let encoded = utf8_percent_encode(&url, LINK_ENCODE_SET).to_string();
        style.insert("link".into(), json!({ "url": encoded }));
    }

    let mut text_run = Map::new();
    text_run.insert("content".into(), json!(run.content));
    if !style.is_empty() {
        text_run.insert("text_element_style".into(), Value::Object(style));
    }
    json!({ "text_run": Value::Object(text_run) })
}

fn parse_inline(text: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut plain = String::new();
    let mut bold = false;
    let mut italic = false;
    let mut rest = text;

    fn flush(runs: &mut Vec<Run>, plain: &mut String, bold: bool, italic: bool) {
        if !plain.is_empty() {
            runs.push(Run {
                content: std::mem::take(plain),
                bold,
                italic,
                link: None,
            });
        }
    }

    while let Some(c) = rest.chars().next() {
        let escaped = match c {
            '\\' => rest[1..].chars().next().filter(char::is_ascii_punctuation),
            _ => None,
        };
        if let Some(e) = escaped {
            plain.push(e);
            rest = &rest[1 + e.len_utf8()..];
        } else if rest.starts_with("**") && (bold || has_marker(&rest[2..], "**")) {
            flush(&mut runs, &mut plain, bold, italic);
            bold = !bold;
            rest = &rest[2..];
        } else if c == '*' && (italic || has_marker(&rest[1..], "*")) {
            flush(&mut runs, &mut plain, bold, italic);
            italic = !italic;
            rest = &rest[1..];
        } else if c == '[' {
            match parse_link(rest) {
                Some((label, url, consumed)) => {
                    flush(&mut runs, &mut plain, bold, italic);
                    runs.push(Run {
                        content: label,
                        bold,
                        italic,
                        link: Some(url.to_string()),
                    });
                    rest = &rest[consumed..];
                }
                None => {
                    plain.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        } else {
            plain.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    flush(&mut runs, &mut plain, bold, italic);

    if runs.is_empty() {
        runs.push(Run::default());
    }
    runs
}

/// Whether `marker` occurs in `text` outside a backslash escape.
fn has_marker(text: &str, marker: &str) -> bool {
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if text[i..].starts_with(marker) {
            return true;
        }
    }
    false
}

/// `[label](url)` at the start of `text` → (unescaped label, url, bytes consumed).
///
/// Parentheses inside the URL must balance, as in `.../Rust_(language)`.
fn parse_link(text: &str) -> Option<(String, &str, usize)> {
    let mut label = String::new();
    let mut label_end = None;
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next_if(|(_, e)| e.is_ascii_punctuation()) {
                Some((_, e)) => label.push(e),
                None => label.push(c),
            },
            '[' => return None,
            ']' => {
                label_end = Some(i);
                break;
            }
            _ => label.push(c),
        }
    }

    let url_start = label_end? + 2;
    if text.get(url_start - 1..url_start) != Some("(") {
        return None;
    }
    let after = &text[url_start..];

    let mut depth = 0usize;
    for (i, c) in after.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            ')' => {
                let url = &after[..i];
                if label.is_empty() || url.is_empty() {
                    return None;
                }
                return Some((label, url, url_start + i + 1));
            }
            _ => {}
        }
    }
    None
}
