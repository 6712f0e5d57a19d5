//! Application configuration. Feed pack, limits, Feishu credentials, theme model.
//!
//! This is the only module that reads the process environment.

use crate::llm_adapter::OpenAiThemeModel;
use crate::publisher::FeishuConfig;
use crate::retry::RetryPolicy;
use crate::types::{
    DigestConfig, DigestError, EnrichConfig, FetchConfig, Result, ThemeModel, DEFAULT_PACK_URL,
};
use interfaces::KeywordThemeModel;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Feishu application credentials. The secret never shows up in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    app_secret: String,
}

impl Credentials {
    /// Both values must be present and non-blank.
    pub fn from_values(app_id: Option<String>, app_secret: Option<String>) -> Result<Self> {
        let app_id = app_id.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let app_secret = app_secret.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        match (app_id, app_secret) {
            (Some(app_id), Some(app_secret)) => Ok(Self { app_id, app_secret }),
            (app_id, app_secret) => {
                let mut missing = Vec::new();
                if app_id.is_none() {
                    missing.push("FEISHU_APP_ID");
                }
                if app_secret.is_none() {
                    missing.push("FEISHU_APP_SECRET");
                }
                Err(DigestError::Configuration(format!(
                    "missing required credentials: {}",
                    missing.join(", ")
                )))
            }
        }
    }

    pub fn app_secret(&self) -> &str {
        &self.app_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .finish()
    }
}

#[derive(Deserialize, Default)]
pub struct AppConfig {
    // ─────────────────────────────────────────────────────────────────────────
    // Feed pack and enrichment
    // ─────────────────────────────────────────────────────────────────────────
    /// Feed pack endpoint. Read from RSS_DIGEST_PACK_URL or RSS_PACK_URL.
    #[serde(default)]
    pub pack_url: Option<String>,

    /// Display name of the pack used in the report header and footer.
    #[serde(default)]
    pub pack_name: Option<String>,

    #[serde(default)]
    pub enrich_cap: Option<usize>,

    /// Per-source enrichment limit. 0 disables the limit.
    #[serde(default)]
    pub max_per_source: Option<usize>,

    /// Characters of article text kept after extraction.
    #[serde(default)]
    pub content_chars: Option<usize>,

    #[serde(default)]
    pub summary_chars: Option<usize>,

    // ─────────────────────────────────────────────────────────────────────────
    // Timeouts, retries, parallelism
    // ─────────────────────────────────────────────────────────────────────────
    #[serde(default)]
    pub feed_timeout_secs: Option<u64>,

    #[serde(default)]
    pub article_timeout_secs: Option<u64>,

    #[serde(default)]
    pub publish_timeout_secs: Option<u64>,

    #[serde(default)]
    pub theme_timeout_secs: Option<u64>,

    #[serde(default)]
    pub max_retries: Option<u32>,

    #[serde(default)]
    pub publish_retries: Option<u32>,

    #[serde(default)]
    pub retry_delay_ms: Option<u64>,

    #[serde(default)]
    pub fetch_concurrency: Option<usize>,

    // ─────────────────────────────────────────────────────────────────────────
    // Report
    // ─────────────────────────────────────────────────────────────────────────
    /// Hours east of UTC used for the report date and timestamps.
    #[serde(default)]
    pub utc_offset_hours: Option<i32>,

    #[serde(default)]
    pub document_title: Option<String>,

    /// Directory for the local markdown copy. No copy is written when unset.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────────────────
    // Feishu
    // ─────────────────────────────────────────────────────────────────────────
    /// Read from FEISHU_APP_ID.
    #[serde(default)]
    pub feishu_app_id: Option<String>,

    /// Read from FEISHU_APP_SECRET.
    #[serde(default)]
    pub feishu_app_secret: Option<String>,

    /// Destination folder. Read from FEISHU_FOLDER_TOKEN.
    #[serde(default)]
    pub feishu_folder_token: Option<String>,

    /// Read from FEISHU_BASE_URL. Defaults to the open.feishu.cn API.
    #[serde(default)]
    pub feishu_base_url: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Theme model
    // ─────────────────────────────────────────────────────────────────────────
    /// Chat-completions API key. Without one the keyword baseline is used.
    #[serde(default)]
    pub ai_api_key: Option<String>,

    #[serde(default)]
    pub ai_api_url: Option<String>,

    #[serde(default)]
    pub ai_model: Option<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("pack_url", &self.pack_url_or_default())
            .field("enrich_cap", &self.enrich_cap)
            .field("output_dir", &self.output_dir)
            .field("feishu_app_id", &self.feishu_app_id)
            .field("feishu_app_secret", &self.feishu_app_secret.as_ref().map(|_| "***"))
            .field("feishu_folder_token", &self.feishu_folder_token)
            .field("feishu_base_url", &self.feishu_base_url)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "***"))
            .field("ai_model", &self.ai_model)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("RSS_DIGEST"));
        if let Ok(path) = std::env::var("RSS_DIGEST_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        let mut cfg: Self = c
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| DigestError::Configuration(e.to_string()))?;

        // The Feishu variables and RSS_PACK_URL are read without the RSS_DIGEST_ prefix.
        override_from_env(&mut cfg.feishu_app_id, "FEISHU_APP_ID");
        override_from_env(&mut cfg.feishu_app_secret, "FEISHU_APP_SECRET");
        override_from_env(&mut cfg.feishu_folder_token, "FEISHU_FOLDER_TOKEN");
        override_from_env(&mut cfg.feishu_base_url, "FEISHU_BASE_URL");
        override_from_env(&mut cfg.pack_url, "RSS_PACK_URL");

        Ok(cfg)
    }

    /// Values that make the run impossible, caught before any network call.
    pub fn validate(&self) -> Result<()> {
        let pack_url = self.pack_url_or_default();
        if !crate::rss_utils::url::is_valid_rss_url(&pack_url) {
            return Err(DigestError::Configuration(format!("invalid pack URL: {}", pack_url)));
        }
        if self.fetch_concurrency == Some(0) {
            return Err(DigestError::Configuration("fetch_concurrency must be at least 1".into()));
        }
        if let Some(hours) = self.utc_offset_hours {
            if !(-23..=23).contains(&hours) {
                return Err(DigestError::Configuration(format!(
                    "utc_offset_hours out of range: {}",
                    hours
                )));
            }
        }
        Ok(())
    }

    pub fn pack_url_or_default(&self) -> String {
        self.pack_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PACK_URL.to_string())
    }

    /// Credentials are required unless the run is a dry run.
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::from_values(self.feishu_app_id.clone(), self.feishu_app_secret.clone())
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(500))
    }

    pub fn fetch_config(&self) -> FetchConfig {
        let defaults = FetchConfig::default();
        FetchConfig {
            timeout_seconds: self.feed_timeout_secs.unwrap_or(defaults.timeout_seconds),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
            fetch_concurrency: self.fetch_concurrency.unwrap_or(defaults.fetch_concurrency),
            ..defaults
        }
    }

    pub fn enrich_config(&self) -> EnrichConfig {
        let defaults = EnrichConfig::default();
        EnrichConfig {
            cap: self.enrich_cap.unwrap_or(defaults.cap),
            max_per_source: match self.max_per_source {
                Some(0) => None,
                Some(n) => Some(n),
                None => defaults.max_per_source,
            },
            max_content_chars: self.content_chars.unwrap_or(defaults.max_content_chars),
            timeout_seconds: self.article_timeout_secs.unwrap_or(defaults.timeout_seconds),
        }
    }

    pub fn digest_config(&self) -> DigestConfig {
        let defaults = DigestConfig::default();
        DigestConfig {
            pack_name: self.pack_name.clone().unwrap_or(defaults.pack_name),
            pack_url: self.pack_url_or_default(),
            document_title: self.document_title.clone().unwrap_or(defaults.document_title),
            utc_offset_hours: self.utc_offset_hours.unwrap_or(defaults.utc_offset_hours),
            theme_timeout: self
                .theme_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.theme_timeout),
            summary_chars: self.summary_chars.unwrap_or(defaults.summary_chars),
        }
    }

    pub fn feishu_config(&self, credentials: Credentials) -> FeishuConfig {
        let mut feishu = FeishuConfig::new(credentials);
        if let Some(base_url) = self.feishu_base_url.clone().filter(|u| !u.trim().is_empty()) {
            feishu.base_url = base_url;
        }
        feishu.folder_token = self.feishu_folder_token.clone();
        if let Some(secs) = self.publish_timeout_secs {
            feishu.timeout = Duration::from_secs(secs);
        }
        feishu.retry = RetryPolicy::new(self.publish_retries.unwrap_or(2), self.retry_delay());
        feishu
    }

    /// Returns true if a chat-completions API key is configured.
    pub fn is_ai_configured(&self) -> bool {
        self.ai_api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Chat-completions model when an API key is set, the keyword baseline otherwise.
    pub fn theme_model(&self) -> Result<Arc<dyn ThemeModel>> {
        match self.ai_api_key.clone().filter(|k| !k.trim().is_empty()) {
            Some(api_key) => {
                let api_url = self
                    .ai_api_url
                    .clone()
                    .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
                let model = self.ai_model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
                let timeout = self.digest_config().theme_timeout;
                let adapter = OpenAiThemeModel::new(api_url, api_key, model, timeout)
                    .map_err(|e| DigestError::Configuration(format!("{:#}", e)))?;
                Ok(Arc::new(adapter))
            }
            None => Ok(Arc::new(KeywordThemeModel)),
        }
    }
}

fn override_from_env(slot: &mut Option<String>, key: &str) {
    if let Ok(value) = std::env::var(key) {
        if !value.trim().is_empty() {
            *slot = Some(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_named() {
        let err = Credentials::from_values(Some("cli_a".into()), Some("  ".into())).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("FEISHU_APP_SECRET"));
        assert!(!err.to_string().contains("FEISHU_APP_ID"));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let credentials = Credentials::from_values(Some("cli_a".into()), Some("s3cr3t".into())).unwrap();
        let rendered = format!("{:?}", credentials);
        assert!(rendered.contains("cli_a"));
        assert!(!rendered.contains("s3cr3t"));

        let cfg = AppConfig {
            feishu_app_secret: Some("s3cr3t".into()),
            ai_api_key: Some("sk-live".into()),
            ..Default::default()
        };
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("sk-live"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.pack_url_or_default(), DEFAULT_PACK_URL);
        assert_eq!(cfg.enrich_config().cap, 20);
        assert_eq!(cfg.enrich_config().max_per_source, Some(2));
        assert_eq!(cfg.fetch_config().fetch_concurrency, 4);
        assert_eq!(cfg.digest_config().utc_offset_hours, 8);
        assert!(!cfg.is_ai_configured());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_max_per_source_disables_the_limit() {
        let cfg = AppConfig {
            max_per_source: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.enrich_config().max_per_source, None);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let cfg = AppConfig {
            pack_url: Some("ftp://example.com/pack".into()),
            ..Default::default()
        };
        assert_eq!(cfg.validate().unwrap_err().exit_code(), 2);

        let cfg = AppConfig {
            fetch_concurrency: Some(0),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
