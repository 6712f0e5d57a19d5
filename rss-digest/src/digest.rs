use crate::rss_utils::text::{strip_markup, truncate_chars};
use crate::types::{CategoryGroup, Digest, DigestConfig, DigestError, Entry, ThemeModel, ThemeReport};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

const MAX_THEMES: usize = 5;
const MODEL_EXCERPT_CHARS: usize = 600;

/// Builds the daily [`Digest`] from the entries picked for it.
pub struct DigestComposer {
    model: Arc<dyn ThemeModel>,
    config: DigestConfig,
}

impl DigestComposer {
    pub fn new(model: Arc<dyn ThemeModel>, config: DigestConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &DigestConfig {
        &self.config
    }

    /// Compose the digest.
    ///
    /// `total_entry_count` is the number of in-window entries; `entries` are the
    /// ones that make it into the document, so `enriched_count` equals the sum
    /// of the category sizes.
    pub async fn compose(&self, entries: &[Entry], total_entry_count: usize, reference: DateTime<Utc>) -> Digest {
        info!("Creating digest for {} entries", entries.len());

        let grouped_entries = group_by_category(entries);
        let source_count = entries
            .iter()
            .map(|e| e.source_name.as_str())
            .collect::<HashSet<_>>()
            .len();

        let report = match self.extract_themes(entries).await {
            Ok(report) => report,
            Err(e) => {
                warn!("{}; falling back to a digest without themes", e);
                ThemeReport::default()
            }
        };

        let digest = Digest {
            date: report_date(reference, self.config.utc_offset_hours),
            total_entry_count,
            enriched_count: entries.len(),
            source_count,
            core_themes: normalize_themes(report.themes),
            editorial_observation: report
                .observation
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
            grouped_entries,
        };

        debug!(
            "Digest has {} categories and {} themes",
            digest.grouped_entries.len(),
            digest.core_themes.len()
        );
        digest
    }

    async fn extract_themes(&self, entries: &[Entry]) -> Result<ThemeReport, DigestError> {
        if entries.is_empty() {
            return Ok(ThemeReport::default());
        }

        let text = model_input(entries);
        let timeout = self.config.theme_timeout;
        match tokio::time::timeout(timeout, self.model.summarize(&text)).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(DigestError::ThemeExtraction(format!("{}: {:#}", self.model.model_name(), e))),
            Err(_) => Err(DigestError::ThemeExtraction(format!(
                "{} timed out after {:?}",
                self.model.model_name(),
                timeout
            ))),
        }
    }
}

/// Every entry lands in exactly one category, its source name.
pub fn group_by_category(entries: &[Entry]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|g| g.label == entry.source_name) {
            Some(group) => group.entries.push(entry.clone()),
            None => groups.push(CategoryGroup {
                label: entry.source_name.clone(),
                entries: vec![entry.clone()],
            }),
        }
    }
    groups
}

/// Trim, drop blanks and duplicates, cap at five.
pub fn normalize_themes(themes: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    themes
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
        .take(MAX_THEMES)
        .collect()
}

pub fn report_offset(utc_offset_hours: i32) -> FixedOffset {
    FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix())
}

pub fn report_date(reference: DateTime<Utc>, utc_offset_hours: i32) -> NaiveDate {
    reference.with_timezone(&report_offset(utc_offset_hours)).date_naive()
}

fn model_input(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|entry| {
            let body = entry
                .full_content
                .clone()
                .filter(|c| !c.trim().is_empty())
                .or_else(|| entry.summary.as_deref().map(strip_markup))
                .unwrap_or_default();
            format!(
                "Title: {}\nSource: {}\nContent: {}",
                entry.title,
                entry.source_name,
                truncate_chars(&body, MODEL_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn themes_are_trimmed_deduplicated_and_capped() {
        let themes = vec![" agents ", "Agents", "", "evals", "rl", "robotics", "scaling", "vision"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(normalize_themes(themes), vec!["agents", "evals", "rl", "robotics", "scaling"]);
    }

    #[test]
    fn report_date_uses_offset() {
        use chrono::TimeZone;
        let reference = Utc.with_ymd_and_hms(2026, 10, 18, 20, 0, 0).unwrap();
        assert_eq!(report_date(reference, 8), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert_eq!(report_date(reference, 0), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
    }
}
