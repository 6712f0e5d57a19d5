use std::fmt;
use std::time::Duration;

pub use interfaces::defs::{CategoryGroup, Digest, Entry, FeedSource, ThemeModel, ThemeReport};

/// Trailing window the daily digest covers.
pub const WINDOW_HOURS: i64 = 24;

pub const DEFAULT_PACK_URL: &str = "https://youmind.com/rss/pack/andrej-karpathy-curated-rss";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_redirects: usize,
    pub fetch_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; RSSDailyBot/1.0)".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 500,
            max_redirects: 5,
            fetch_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub cap: usize,
    /// `None` means no per-source limit.
    pub max_per_source: Option<usize>,
    pub max_content_chars: usize,
    pub timeout_seconds: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            cap: 20,
            max_per_source: Some(2),
            max_content_chars: 500,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DigestConfig {
    pub pack_name: String,
    pub pack_url: String,
    /// Document title suffix; the published title is `"{date} - {document_title}"`.
    pub document_title: String,
    pub utc_offset_hours: i32,
    pub theme_timeout: Duration,
    pub summary_chars: usize,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            pack_name: "Andrej Karpathy curated RSS".to_string(),
            pack_url: DEFAULT_PACK_URL.to_string(),
            document_title: "Karpathy 精选 RSS 日报".to_string(),
            utc_offset_hours: 8,
            theme_timeout: Duration::from_secs(60),
            summary_chars: 300,
        }
    }
}

/// Step of the publish state machine where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    Authenticate,
    CreateDocument,
    WriteContent,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::Authenticate => "authentication",
            PublishStep::CreateDocument => "document creation",
            PublishStep::WriteContent => "content write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    /// Credentials or permissions were refused. Retrying will not help.
    Rejected,
    /// The platform stayed unreachable or kept failing after all retries.
    Transient,
}

impl fmt::Display for AuthFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthFailureKind::Rejected => f.write_str("rejected"),
            AuthFailureKind::Transient => f.write_str("transient"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Feed pack unreachable at {url}: {reason}")]
    FeedPackUnreachable { url: String, reason: String },

    #[error("Failed to fetch feed {url}: {reason}")]
    SourceFetch { url: String, reason: String },

    #[error("Failed to fetch article {url}: {reason}")]
    ArticleFetch { url: String, reason: String },

    #[error("Theme extraction unavailable: {0}")]
    ThemeExtraction(String),

    #[error("Authentication failed during {step} ({kind}): {message}")]
    Authentication {
        step: PublishStep,
        kind: AuthFailureKind,
        status: Option<u16>,
        message: String,
    },

    #[error("Document {step} failed: {message}")]
    DocumentOperation {
        step: PublishStep,
        status: Option<u16>,
        message: String,
    },

    #[error("Publisher already used (state {0})")]
    PublisherReused(String),

    #[error("HTTP {status} from {url}{}", detail_suffix(.detail))]
    Status {
        url: String,
        status: u16,
        /// Error text the server put in the response body, if any.
        detail: Option<String>,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DigestError {
    /// Process exit code for a run that ends with this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            DigestError::Configuration(_) => 2,
            DigestError::FeedPackUnreachable { .. } => 3,
            DigestError::Authentication { .. } => 4,
            DigestError::DocumentOperation { .. } => 5,
            _ => 1,
        }
    }

    /// Network failures and 5xx/429 responses are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            DigestError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            DigestError::Status { status, .. } => is_transient_status(*status),
            _ => false,
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default()
}

pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

pub type Result<T> = std::result::Result<T, DigestError>;
