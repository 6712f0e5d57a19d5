//! Markdown rendering of a [`Digest`].
//!
//! Output is a pure function of the digest and config: rendering the same
//! digest twice yields the same bytes.

use crate::digest::report_offset;
use crate::rss_utils::text::{strip_markup, truncate_chars};
use crate::types::{Digest, DigestConfig, Entry};
use std::fmt::Write;

const CATEGORY_MARKERS: [&str; 8] = ["📖", "💡", "🚀", "🎯", "⚡", "🔮", "🔬", "🎨"];
const NO_THEMES: &str = "暂无明显主题";

pub fn render_markdown(digest: &Digest, config: &DigestConfig) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "> {} 精选的信源资讯汇总 | 共 {} 条更新\n\n---\n",
        config.pack_name, digest.total_entry_count
    );

    let _ = writeln!(out, "## 🔥 核心主题\n\n{}\n\n---\n", format_themes(&digest.core_themes));

    for (idx, group) in digest.grouped_entries.iter().enumerate() {
        let marker = CATEGORY_MARKERS[idx % CATEGORY_MARKERS.len()];
        let _ = writeln!(out, "## {} {}\n", marker, escape_markdown(&group.label));
        for entry in &group.entries {
            render_entry(&mut out, entry, config);
        }
    }

    let _ = writeln!(
        out,
        "## 📊 今日数据\n\n- **{}** 条 RSS 更新\n- **{}** 篇精选深度阅读\n- **{}** 个信息源\n- **{}** 个核心主题\n",
        digest.total_entry_count,
        digest.enriched_count,
        digest.source_count,
        digest.core_themes.len()
    );

    let observation = digest
        .editorial_observation
        .clone()
        .unwrap_or_else(|| default_observation(digest));
    let _ = writeln!(out, "## 💡 编者观察\n\n{}\n\n---\n", observation);

    let _ = writeln!(
        out,
        "*本日报由 AI 自动生成 | 数据源：[{}]({})*",
        config.pack_name, config.pack_url
    );

    out
}

fn render_entry(out: &mut String, entry: &Entry, config: &DigestConfig) {
    let _ = writeln!(out, "### [{}]({})\n", escape_markdown(&entry.title), entry.link);

    if let Some(snippet) = snippet(entry, config.summary_chars) {
        let _ = writeln!(out, "{}\n", snippet);
    }

    let published = entry
        .published
        .map(|ts| {
            ts.with_timezone(&report_offset(config.utc_offset_hours))
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_default();
    let _ = writeln!(
        out,
        "*来源: {} | {}*\n\n---\n",
        escape_markdown(&entry.source_name),
        published
    );
}

/// Full article text when enrichment worked, else the trimmed feed summary.
pub fn snippet(entry: &Entry, summary_chars: usize) -> Option<String> {
    if entry.has_full_content() {
        return entry.full_content.clone();
    }
    entry
        .summary
        .as_deref()
        .map(strip_markup)
        .filter(|s| !s.is_empty())
        .map(|s| truncate_chars(&s, summary_chars))
}

/// Backslash-escapes the characters that open links or emphasis in feed text.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']' | '*') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn format_themes(themes: &[String]) -> String {
    if themes.is_empty() {
        return NO_THEMES.to_string();
    }
    themes
        .iter()
        .map(|t| format!("**{}**", escape_markdown(t)))
        .collect::<Vec<_>>()
        .join("、")
}

fn default_observation(digest: &Digest) -> String {
    let busiest = digest
        .grouped_entries
        .iter()
        .fold(None::<(&str, usize)>, |best, g| match best {
            Some((_, n)) if n >= g.entries.len() => best,
            _ => Some((g.label.as_str(), g.entries.len())),
        });

    match busiest {
        Some((label, count)) => format!(
            "今日共收录 {} 条更新，精选 {} 篇，来自 {} 个信息源；{} 贡献最多（{} 篇）。",
            digest.total_entry_count, digest.enriched_count, digest.source_count, label, count
        ),
        None => format!("今日共收录 {} 条更新。", digest.total_entry_count),
    }
}
