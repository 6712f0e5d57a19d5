use crate::extract::extract_readable_text;
use crate::fetcher::Fetcher;
use crate::types::{DigestError, EnrichConfig, Entry, Result};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Result of an enrichment pass.
///
/// `entries` always has the same length and order as the input; `selected`
/// holds the indices that were picked for a full-content fetch, best first.
#[derive(Debug)]
pub struct EnrichmentReport {
    pub entries: Vec<Entry>,
    pub selected: Vec<usize>,
    pub succeeded: usize,
    pub failed: usize,
}

impl EnrichmentReport {
    /// The selected entries in ranking order.
    pub fn selected_entries(&self) -> Vec<Entry> {
        self.selected.iter().map(|&i| self.entries[i].clone()).collect()
    }
}

pub struct ContentEnricher {
    fetcher: Fetcher,
    config: EnrichConfig,
}

impl ContentEnricher {
    pub fn new(fetcher: Fetcher, config: EnrichConfig) -> Self {
        Self { fetcher, config }
    }

    /// Rank by recency and take up to `cap` entries, honouring `max_per_source`.
    ///
    /// Ties keep input order.
    pub fn select(&self, entries: &[Entry]) -> Vec<usize> {
        let mut ranked: Vec<usize> = (0..entries.len()).collect();
        ranked.sort_by(|&a, &b| entries[b].published.cmp(&entries[a].published));

        let mut per_source: HashMap<&str, usize> = HashMap::new();
        let mut selected = Vec::new();
        for index in ranked {
            if selected.len() >= self.config.cap {
                break;
            }
            let taken = per_source.entry(entries[index].source_name.as_str()).or_insert(0);
            if self.config.max_per_source.is_some_and(|max| *taken >= max) {
                continue;
            }
            *taken += 1;
            selected.push(index);
        }
        selected
    }

    pub async fn enrich(&self, mut entries: Vec<Entry>) -> EnrichmentReport {
        let selected = self.select(&entries);
        info!("Enriching {} of {} entries", selected.len(), entries.len());

        let mut succeeded = 0;
        let mut failed = 0;
        for &index in &selected {
            let entry = &mut entries[index];
            match self.fetch_article(&entry.link).await {
                Ok(content) => {
                    debug!("Enriched {} ({} chars)", entry.link, content.chars().count());
                    entry.full_content = Some(content);
                    succeeded += 1;
                }
                Err(e) => {
                    warn!("{}", e);
                    failed += 1;
                }
            }
        }

        info!("Enrichment finished: {} succeeded, {} failed", succeeded, failed);
        EnrichmentReport {
            entries,
            selected,
            succeeded,
            failed,
        }
    }

    async fn fetch_article(&self, url: &str) -> Result<String> {
        let failure = |reason: String| DigestError::ArticleFetch {
            url: url.to_string(),
            reason,
        };

        let html = self
            .fetcher
            .fetch_full_content(url)
            .await
            .map_err(|e| failure(e.to_string()))?;

        let text = extract_readable_text(&html, self.config.max_content_chars);
        if text.is_empty() {
            return Err(failure("no readable text found".to_string()));
        }
        Ok(text)
    }
}
