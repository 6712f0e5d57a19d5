use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// One syndicated article reference.
///
/// `full_content` stays `None` until the enricher attaches the article body;
/// nothing else changes after the aggregator creates the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub source_name: String,
    pub summary: Option<String>,
    pub full_content: Option<String>,
    pub categories: Vec<String>,
}

impl Entry {
    pub fn has_full_content(&self) -> bool {
        self.full_content.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub label: String,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub date: NaiveDate,
    pub total_entry_count: usize,
    pub enriched_count: usize,
    pub source_count: usize,
    pub core_themes: Vec<String>,
    pub editorial_observation: Option<String>,
    /// Categories in first-appearance order.
    pub grouped_entries: Vec<CategoryGroup>,
}

impl Digest {
    pub fn category_total(&self) -> usize {
        self.grouped_entries.iter().map(|g| g.entries.len()).sum()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.grouped_entries.iter().flat_map(|g| g.entries.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeReport {
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub observation: Option<String>,
}

// Object style note:
// A theme model is called once per run with the whole day's text. Implementations
// either stay deterministic (baseline, empty) or wrap an external text generator.
// Callers own the timeout and the fallback; a model just reports what it found.

#[async_trait]
pub trait ThemeModel: Send + Sync {
    fn model_name(&self) -> String;

    async fn summarize(&self, text: &str) -> anyhow::Result<ThemeReport>;
}
