use crate::rss_utils;
use crate::types::{DigestError, Entry, FeedSource, Result};
use feed_rs::parser;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<Entry>,
}

/// Pack listings served as JSON instead of a syndication document.
#[derive(Deserialize)]
#[serde(untagged)]
enum PackItem {
    Url(String),
    Source { name: Option<String>, url: String },
}

pub struct FeedParser;

impl FeedParser {
    /// Parse a feed pack into its subscribed sources.
    ///
    /// The pack is normally a syndication document whose entry links point at
    /// feeds; a JSON list of URLs or `{name, url}` objects is accepted too.
    pub fn parse_pack(content: &str) -> Result<Vec<FeedSource>> {
        let candidates = match parser::parse(content.as_bytes()) {
            Ok(feed) => feed
                .entries
                .into_iter()
                .filter_map(|entry| {
                    let url = entry.links.first()?.href.trim().to_string();
                    let name = entry.title.map(|t| t.content.trim().to_string());
                    Some((name, url))
                })
                .collect::<Vec<_>>(),
            Err(feed_err) => match serde_json::from_str::<Vec<PackItem>>(content) {
                Ok(items) => items
                    .into_iter()
                    .map(|item| match item {
                        PackItem::Url(url) => (None, url),
                        PackItem::Source { name, url } => (name, url),
                    })
                    .collect(),
                Err(_) => {
                    return Err(DigestError::Parse(format!("Failed to parse feed pack: {}", feed_err)));
                }
            },
        };

        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for (name, url) in candidates {
            if !rss_utils::url::is_valid_rss_url(&url) {
                warn!("Skipping pack link that is not an http(s) URL: {:?}", url);
                continue;
            }
            if !seen.insert(url.clone()) {
                debug!("Skipping duplicate pack link: {}", url);
                continue;
            }
            let name = name
                .filter(|n| !n.is_empty())
                .or_else(|| rss_utils::url::extract_domain(&url))
                .unwrap_or_else(|| url.clone());
            sources.push(FeedSource { name, url });
        }

        info!("Parsed feed pack with {} sources", sources.len());
        Ok(sources)
    }

    pub fn parse_feed(content: &str, source: &FeedSource) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes) from {}", content.len(), source.url);

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| DigestError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty());
        let source_name = title.clone().unwrap_or_else(|| source.name.clone());

        let entries: Vec<Entry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::parse_entry(entry, &source_name))
            .collect();

        debug!("Parsed {} entries from {}", entries.len(), source.url);

        Ok(ParsedFeed { title, entries })
    }

    fn parse_entry(entry: feed_rs::model::Entry, source_name: &str) -> Option<Entry> {
        let link = match entry.links.first() {
            Some(link) => link.href.clone(),
            None => {
                debug!("Skipping entry without a link: {}", entry.id);
                return None;
            }
        };

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .filter(|s| !s.trim().is_empty());

        // Feeds without a publish date often still carry an update date.
        let published = entry.published.or(entry.updated);

        let categories = entry.categories.into_iter().map(|c| c.term).collect();

        Some(Entry {
            title,
            link,
            published,
            source_name: source_name.to_string(),
            summary,
            full_content: None,
            categories,
        })
    }

    /// Drop entries whose link was already seen, keeping the first occurrence.
    pub fn deduplicate_entries(entries: Vec<Entry>) -> Vec<Entry> {
        let before = entries.len();
        let mut seen_links = HashSet::new();
        let unique: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| {
                let fresh = seen_links.insert(entry.link.clone());
                if !fresh {
                    debug!("Removing duplicate entry: {} ({})", entry.title, entry.link);
                }
                fresh
            })
            .collect();

        let removed = before - unique.len();
        if removed > 0 {
            info!("Removed {} duplicate entries", removed);
        }
        unique
    }
}
