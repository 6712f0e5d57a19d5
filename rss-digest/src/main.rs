use clap::Parser;
use rss_digest::{AppConfig, DigestError, DigestPipeline, PipelineSettings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Daily digest of the last 24h of a curated RSS pack, published to Feishu.
#[derive(Debug, Parser)]
#[command(name = "rss-digest", version, about)]
struct Cli {
    /// Build and render the digest without publishing. Credentials become optional.
    #[arg(long)]
    dry_run: bool,

    /// Feed pack URL (overrides RSS_PACK_URL).
    #[arg(long)]
    pack_url: Option<String>,

    /// Maximum number of entries enriched with article text.
    #[arg(long)]
    enrich_cap: Option<usize>,

    /// Directory for a local markdown copy of the report.
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (env_file, filter) = log_filter(|| dotenv::dotenv().ok());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Runs `load_env` before reading `RUST_LOG`, so a level set in `.env` applies.
fn log_filter(load_env: impl FnOnce() -> Option<PathBuf>) -> (Option<PathBuf>, EnvFilter) {
    let env_file = load_env();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    (env_file, filter)
}

async fn run(cli: Cli) -> Result<(), DigestError> {
    let mut cfg = AppConfig::load()?;
    if let Some(pack_url) = cli.pack_url {
        cfg.pack_url = Some(pack_url);
    }
    if let Some(cap) = cli.enrich_cap {
        cfg.enrich_cap = Some(cap);
    }
    if let Some(dir) = cli.output_dir {
        cfg.output_dir = Some(dir);
    }

    let settings = PipelineSettings::from_app_config(&cfg, cli.dry_run)?;
    let model = cfg.theme_model()?;
    let pipeline = DigestPipeline::new(settings, model)?;

    let summary = pipeline.run(chrono::Utc::now()).await?;
    match (&summary.document_id, &summary.report_path) {
        (Some(id), _) => info!("Published digest document {}", id),
        (None, Some(path)) => info!("Digest written to {}", path.display()),
        (None, None) if cli.dry_run => {
            if let Some(markdown) = &summary.markdown {
                println!("{}", markdown);
            }
        }
        (None, None) => info!("Nothing published"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn rust_log_from_env_file_sets_the_filter() {
        let dir = std::env::temp_dir().join(format!("rss-digest-env-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(".env");
        std::fs::write(&path, "RUST_LOG=rss_digest=trace\n").unwrap();
        std::env::remove_var("RUST_LOG");

        let (env_file, filter) = log_filter(|| dotenv::from_path(&path).ok().map(|_| path.clone()));

        assert_eq!(env_file.as_deref(), Some(path.as_path()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
        std::env::remove_var("RUST_LOG");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
