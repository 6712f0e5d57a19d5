use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::types::{DigestError, Entry, FeedSource, Result};
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};

/// Outcome of fetching every source in the pack.
#[derive(Debug, Default)]
pub struct AggregationReport {
    pub entries: Vec<Entry>,
    pub sources_ok: usize,
    pub sources_failed: usize,
}

pub struct FeedAggregator {
    fetcher: Fetcher,
}

impl FeedAggregator {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    /// Fetch the pack listing. Any failure here is fatal for the run.
    pub async fn fetch_sources(&self, pack_url: &str) -> Result<Vec<FeedSource>> {
        info!("Fetching feed pack: {}", pack_url);

        let content = self
            .fetcher
            .fetch_text(pack_url)
            .await
            .map_err(|e| DigestError::FeedPackUnreachable {
                url: pack_url.to_string(),
                reason: e.to_string(),
            })?;

        FeedParser::parse_pack(&content).map_err(|e| DigestError::FeedPackUnreachable {
            url: pack_url.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<Entry>> {
        let content = self
            .fetcher
            .fetch_text(&source.url)
            .await
            .map_err(|e| DigestError::SourceFetch {
                url: source.url.clone(),
                reason: e.to_string(),
            })?;

        let parsed = FeedParser::parse_feed(&content, source).map_err(|e| DigestError::SourceFetch {
            url: source.url.clone(),
            reason: e.to_string(),
        })?;

        info!("Feed {}: found {} entries", source.url, parsed.entries.len());
        Ok(parsed.entries)
    }

    /// Fetch every source, skipping the ones that fail.
    ///
    /// Fetches run with bounded parallelism but results are joined in pack order.
    pub async fn fetch_all(&self, sources: &[FeedSource]) -> AggregationReport {
        let concurrency = self.fetcher.config().fetch_concurrency.max(1);
        info!("Fetching {} feeds (concurrency {})", sources.len(), concurrency);

        let results: Vec<(&FeedSource, Result<Vec<Entry>>)> = stream::iter(sources)
            .map(|source| async move { (source, self.fetch_entries(source).await) })
            .buffered(concurrency)
            .collect()
            .await;

        let mut report = AggregationReport::default();
        let mut entries = Vec::new();
        for (source, result) in results {
            match result {
                Ok(found) => {
                    report.sources_ok += 1;
                    entries.extend(found);
                }
                Err(e) => {
                    report.sources_failed += 1;
                    error!("Skipping source {}: {}", source.name, e);
                }
            }
        }

        if report.sources_failed > 0 {
            warn!("{}/{} feeds failed", report.sources_failed, sources.len());
        }

        report.entries = FeedParser::deduplicate_entries(entries);
        info!(
            "Successfully fetched {}/{} feeds, {} entries",
            report.sources_ok,
            sources.len(),
            report.entries.len()
        );
        report
    }
}
