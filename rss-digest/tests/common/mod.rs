#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rss_digest::{
    Credentials, DigestConfig, EnrichConfig, Entry, FeishuConfig, FetchConfig, PipelineSettings, RetryPolicy,
};
use std::sync::Once;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("rss_digest=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Fixed reference time for every scenario.
pub fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
}

pub fn hours_before(hours: i64) -> DateTime<Utc> {
    reference() - Duration::hours(hours)
}

pub struct Item<'a> {
    pub title: &'a str,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
}

pub fn item(title: &str, link: String, published: Option<DateTime<Utc>>) -> Item<'_> {
    Item { title, link, published }
}

pub fn rss_feed(title: &str, items: &[Item<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\"><channel><title>{}</title><link>https://example.com</link><description>test feed</description>",
        title
    );
    for item in items {
        xml.push_str("<item>");
        xml.push_str(&format!("<title>{}</title><link>{}</link>", item.title, item.link));
        if let Some(ts) = item.published {
            xml.push_str(&format!("<pubDate>{}</pubDate>", ts.to_rfc2822()));
        }
        xml.push_str(&format!("<description>Summary of {}</description>", item.title));
        xml.push_str("</item>");
    }
    xml.push_str("</channel></rss>");
    xml
}

/// A feed pack: an RSS document whose item links are feed URLs.
pub fn pack(sources: &[(&str, String)]) -> String {
    let items: Vec<Item<'_>> = sources
        .iter()
        .map(|(name, url)| item(name, url.clone(), None))
        .collect();
    rss_feed("Curated pack", &items)
}

pub fn article_html(body: &str) -> String {
    format!(
        "<html><head><script>var tracking = 1;</script></head><body><nav>Home | About</nav><article><h1>Heading</h1><p>{}</p></article><footer>Copyright</footer></body></html>",
        body
    )
}

pub fn entry(title: &str, link: String, source: &str, published: DateTime<Utc>) -> Entry {
    Entry {
        title: title.to_string(),
        link,
        published: Some(published),
        source_name: source.to_string(),
        summary: Some(format!("Summary of {}", title)),
        full_content: None,
        categories: Vec::new(),
    }
}

pub fn fetch_config() -> FetchConfig {
    FetchConfig {
        timeout_seconds: 5,
        max_retries: 1,
        retry_delay_ms: 1,
        ..FetchConfig::default()
    }
}

pub fn feishu_config(base_url: String) -> FeishuConfig {
    let credentials = Credentials::from_values(Some("cli_test".into()), Some("test-secret".into())).unwrap();
    FeishuConfig {
        base_url,
        retry: RetryPolicy::new(2, std::time::Duration::from_millis(1)),
        ..FeishuConfig::new(credentials)
    }
}

pub fn settings(pack_url: String, feishu: Option<FeishuConfig>) -> PipelineSettings {
    PipelineSettings {
        fetch: fetch_config(),
        enrich: EnrichConfig {
            timeout_seconds: 5,
            ..EnrichConfig::default()
        },
        digest: DigestConfig {
            pack_url,
            ..DigestConfig::default()
        },
        feishu,
        output_dir: None,
    }
}
