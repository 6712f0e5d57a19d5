use crate::aggregator::FeedAggregator;
use crate::config::AppConfig;
use crate::digest::{report_date, DigestComposer};
use crate::enricher::ContentEnricher;
use crate::fetcher::Fetcher;
use crate::publisher::{FeishuClient, FeishuConfig, Publisher};
use crate::render::render_markdown;
use crate::rss_utils::time::format_duration;
use crate::types::{DigestConfig, DigestError, EnrichConfig, FetchConfig, Result, ThemeModel};
use crate::window::{filter_recent, sort_newest_first};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Everything a run needs, resolved from configuration and CLI flags.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub fetch: FetchConfig,
    pub enrich: EnrichConfig,
    pub digest: DigestConfig,
    /// `None` skips publishing (dry run).
    pub feishu: Option<FeishuConfig>,
    pub output_dir: Option<PathBuf>,
}

impl PipelineSettings {
    /// Credentials are only demanded when the run will publish.
    pub fn from_app_config(config: &AppConfig, dry_run: bool) -> Result<Self> {
        config.validate()?;
        let feishu = if dry_run {
            None
        } else {
            Some(config.feishu_config(config.credentials()?))
        };

        Ok(Self {
            fetch: config.fetch_config(),
            enrich: config.enrich_config(),
            digest: config.digest_config(),
            feishu,
            output_dir: config.output_dir.clone(),
        })
    }
}

/// What a finished run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub sources: usize,
    pub sources_failed: usize,
    pub entries_fetched: usize,
    pub entries_in_window: usize,
    /// Entries picked for the digest.
    pub selected: usize,
    /// Selected entries whose article text was fetched.
    pub enriched: usize,
    pub markdown: Option<String>,
    pub report_path: Option<PathBuf>,
    pub document_id: Option<String>,
}

/// Fetch → filter → enrich → compose → render → publish, one stage after another.
pub struct DigestPipeline {
    aggregator: FeedAggregator,
    enricher: ContentEnricher,
    composer: DigestComposer,
    settings: PipelineSettings,
}

impl DigestPipeline {
    pub fn new(settings: PipelineSettings, model: Arc<dyn ThemeModel>) -> Result<Self> {
        let feed_fetcher = Fetcher::new(settings.fetch.clone())?;
        let article_fetcher = Fetcher::new(FetchConfig {
            timeout_seconds: settings.enrich.timeout_seconds,
            ..settings.fetch.clone()
        })?;

        info!("Theme model: {}", model.model_name());
        Ok(Self {
            aggregator: FeedAggregator::new(feed_fetcher),
            enricher: ContentEnricher::new(article_fetcher, settings.enrich.clone()),
            composer: DigestComposer::new(model, settings.digest.clone()),
            settings,
        })
    }

    pub async fn run(&self, reference: DateTime<Utc>) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("digest_run", %run_id);
        self.run_stages(run_id, reference).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid, reference: DateTime<Utc>) -> Result<RunSummary> {
        let started = Utc::now();
        let digest_config = &self.settings.digest;
        info!("Starting digest run for window ending {}", reference);

        let sources = self.aggregator.fetch_sources(&digest_config.pack_url).await?;
        if sources.is_empty() {
            return Err(DigestError::FeedPackUnreachable {
                url: digest_config.pack_url.clone(),
                reason: "pack lists no feeds".to_string(),
            });
        }
        info!("Feed pack lists {} sources", sources.len());

        let aggregation = self.aggregator.fetch_all(&sources).await;
        let entries_fetched = aggregation.entries.len();

        let mut recent = filter_recent(aggregation.entries, reference);
        sort_newest_first(&mut recent);
        let entries_in_window = recent.len();
        info!("{} of {} entries fall in the last 24h", entries_in_window, entries_fetched);

        let mut summary = RunSummary {
            run_id,
            sources: sources.len(),
            sources_failed: aggregation.sources_failed,
            entries_fetched,
            entries_in_window,
            selected: 0,
            enriched: 0,
            markdown: None,
            report_path: None,
            document_id: None,
        };

        if recent.is_empty() {
            warn!("No entries in the last 24h, nothing to publish");
            return Ok(summary);
        }

        let enrichment = self.enricher.enrich(recent).await;
        let selected = enrichment.selected_entries();
        summary.selected = selected.len();
        summary.enriched = enrichment.succeeded;

        let digest = self.composer.compose(&selected, entries_in_window, reference).await;
        let markdown = render_markdown(&digest, digest_config);

        if let Some(dir) = &self.settings.output_dir {
            let date = report_date(reference, digest_config.utc_offset_hours);
            let path = write_local_copy(dir, &date.to_string(), &markdown).await?;
            info!("Saved local report to {}", path.display());
            summary.report_path = Some(path);
        }

        match &self.settings.feishu {
            Some(feishu) => {
                let title = format!("{} - {}", digest.date, digest_config.document_title);
                let mut publisher = Publisher::new(FeishuClient::new(feishu.clone())?);
                let document_id = publisher.publish(&title, &markdown).await?;
                summary.document_id = Some(document_id);
            }
            None => info!("Dry run: skipping publish"),
        }

        let elapsed = (Utc::now() - started).max(chrono::Duration::zero());
        info!(
            "Digest run finished in {}: {} sources, {} in window, {} enriched",
            format_duration(elapsed),
            summary.sources,
            summary.entries_in_window,
            summary.enriched
        );
        summary.markdown = Some(markdown);
        Ok(summary)
    }
}

async fn write_local_copy(dir: &Path, date: &str, markdown: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("rss_report_{}.md", date));
    tokio::fs::write(&path, markdown).await?;
    Ok(path)
}
