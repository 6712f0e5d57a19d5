pub mod aggregator;
pub mod config;
pub mod digest;
pub mod enricher;
pub mod extract;
pub mod fetcher;
pub mod llm_adapter;
pub mod parser;
pub mod pipeline;
pub mod publisher;
pub mod render;
pub mod retry;
pub mod rss_utils;
pub mod types;
pub mod window;

pub use types::*;
pub use interfaces::{EmptyThemeModel, KeywordThemeModel};
pub use aggregator::{AggregationReport, FeedAggregator};
pub use config::{AppConfig, Credentials};
pub use digest::DigestComposer;
pub use enricher::{ContentEnricher, EnrichmentReport};
pub use fetcher::Fetcher;
pub use llm_adapter::OpenAiThemeModel;
pub use parser::FeedParser;
pub use pipeline::{DigestPipeline, PipelineSettings, RunSummary};
pub use publisher::{DocumentPlatform, FeishuClient, FeishuConfig, PublishState, Publisher};
pub use render::render_markdown;
pub use retry::RetryPolicy;
