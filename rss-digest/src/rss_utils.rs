/// URL utilities for feeds and articles
pub mod url {
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str).ok()?.domain().map(|d| d.to_string())
    }

    /// Validate RSS feed URL format
    pub fn is_valid_rss_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Time utilities
pub mod time {
    use chrono::Duration;

    /// Format duration in human-readable form
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.num_seconds();

        if total_seconds < 60 {
            format!("{}s", total_seconds)
        } else if total_seconds < 3600 {
            format!("{}m{}s", total_seconds / 60, total_seconds % 60)
        } else {
            format!("{}h{}m", total_seconds / 3600, (total_seconds % 3600) / 60)
        }
    }
}

/// Text helpers shared by extraction and rendering
pub mod text {
    /// Strip markup tags and collapse whitespace.
    pub fn strip_markup(html: &str) -> String {
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate to `max_chars` characters, appending `...` when anything was cut.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        match text.char_indices().nth(max_chars) {
            Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
            None => text.to_string(),
        }
    }
}
