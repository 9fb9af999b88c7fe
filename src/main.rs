use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use consumed_enricher::artwork::{ArtworkFetcher, ArtworkStore};
use consumed_enricher::config::{AppConfig, CliConfig, Credentials, FileConfig, DEFAULT_USER_AGENT};
use consumed_enricher::provider::ProviderResolver;
use consumed_enricher::records::{RecordFilter, RecordSource};
use consumed_enricher::{Domain, EnrichOptions, Enricher};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().context("Error resolving current directory")?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(about = "Fill in metadata and artwork for consumed books, movies and albums")]
struct CliArgs {
    /// Only process records whose title contains one of these (case-insensitive).
    pub titles: Vec<String>,

    /// Site root holding content/, static/ and data/.
    #[clap(long, default_value = ".", value_parser = parse_path)]
    pub root: PathBuf,

    /// Path to a TOML config file. Values there override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Restrict the run to these domains (repeatable). Defaults to all.
    #[clap(long = "domain", value_enum)]
    pub domains: Vec<Domain>,

    /// Resolve and report without writing documents or artwork.
    #[clap(long)]
    pub dry_run: bool,

    /// Skip records that already carry their key metadata.
    #[clap(long)]
    pub skip_existing: bool,

    /// Also process records marked as drafts.
    #[clap(long)]
    pub include_drafts: bool,

    /// Content directory, defaults to <root>/content.
    #[clap(long, value_parser = parse_path)]
    pub content_dir: Option<PathBuf>,

    /// Static assets directory, defaults to <root>/static.
    #[clap(long, value_parser = parse_path)]
    pub static_dir: Option<PathBuf>,

    /// Books collection file, defaults to <root>/data/books/books.toml.
    #[clap(long, value_parser = parse_path)]
    pub books_collection: Option<PathBuf>,

    /// Pause between records, in milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub rate_limit_ms: u64,

    /// Timeout in seconds for catalog API requests.
    #[clap(long, default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Timeout in seconds for artwork downloads.
    #[clap(long, default_value_t = 30)]
    pub download_timeout_secs: u64,

    /// User-Agent sent with every request.
    #[clap(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Attempts per request when the service is throttling or unavailable.
    #[clap(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Base delay in milliseconds between attempts, multiplied by the attempt number.
    #[clap(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            root: self.root.clone(),
            content_dir: self.content_dir.clone(),
            static_dir: self.static_dir.clone(),
            books_collection: self.books_collection.clone(),
            rate_limit_ms: self.rate_limit_ms,
            request_timeout_secs: self.request_timeout_secs,
            download_timeout_secs: self.download_timeout_secs,
            user_agent: self.user_agent.clone(),
            max_attempts: self.max_attempts,
            base_delay_ms: self.retry_delay_ms,
        }
    }

    fn selected_domains(&self) -> Vec<Domain> {
        if self.domains.is_empty() {
            return Domain::ALL.to_vec();
        }
        let mut domains = self.domains.clone();
        domains.sort();
        domains.dedup();
        domains
    }
}

#[cfg(not(feature = "no_artwork"))]
fn artwork_fetcher(config: &AppConfig) -> Result<Option<Box<dyn ArtworkFetcher>>> {
    use consumed_enricher::artwork::HttpArtworkFetcher;
    use consumed_enricher::provider::RetryPolicy;

    let fetcher = HttpArtworkFetcher::new(
        &config.user_agent,
        config.download_timeout,
        RetryPolicy::new(&config.retry),
    )
    .context("Failed to create artwork fetcher")?;
    Ok(Some(Box::new(fetcher)))
}

#[cfg(feature = "no_artwork")]
fn artwork_fetcher(_config: &AppConfig) -> Result<Option<Box<dyn ArtworkFetcher>>> {
    info!("Artwork downloads disabled");
    Ok(None)
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let credentials = Credentials::from_env(&config.env_file());

    if cli_args.dry_run {
        info!("Dry run: no files will be written");
    }

    let options = EnrichOptions {
        dry_run: cli_args.dry_run,
        rate_limit: config.rate_limit,
        filter: RecordFilter {
            include_drafts: cli_args.include_drafts,
            skip_existing: cli_args.skip_existing,
            titles: cli_args.titles.clone(),
        },
    };

    let source = RecordSource::new(&config.content_dir, config.collection_files.clone());
    let mut enricher = Enricher::new(
        source,
        ArtworkStore::new(&config.static_dir),
        artwork_fetcher(&config)?,
        options,
    );

    let mut enabled = 0;
    for domain in cli_args.selected_domains() {
        match ProviderResolver::for_domain(domain, &config, &credentials) {
            Ok(resolver) => {
                info!("{}: using {}", domain, resolver.provider_names().join(" -> "));
                enricher = enricher.with_resolver(domain, resolver);
                enabled += 1;
            }
            Err(e) => warn!("Skipping {} records: {}", domain, e),
        }
    }
    if enabled == 0 {
        anyhow::bail!("No domain can be processed, check credentials in {:?}", config.env_file());
    }

    let summary = enricher.run();
    if summary.total_failed() > 0 {
        warn!("{} record(s) failed", summary.total_failed());
    }
    info!("Done!");
    Ok(())
}
