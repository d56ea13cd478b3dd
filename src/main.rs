use anyhow::{Context, Result};
use clap::Parser;
use melodex::catalog::CatalogService;
use melodex::config::{AppConfig, CliConfig, FileConfig};
use melodex::entity_store::SqliteEntityStore;
use melodex::graph_mirror::SqliteGraphMirror;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite entity database file.
    #[clap(value_parser = parse_path)]
    pub entity_db: PathBuf,

    /// Path to the SQLite graph mirror database file.
    #[clap(value_parser = parse_path)]
    pub graph_db: PathBuf,

    /// Path to an optional TOML config file; file values override CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Clear the graph mirror and rebuild it from the entity store.
    #[clap(long)]
    pub rebuild: bool,

    /// Number of read connections per store.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,

    /// Bounded execution budget for graph reads, in milliseconds.
    #[clap(long, default_value_t = 500)]
    pub query_timeout_ms: u64,

    /// Re-mirror recently updated entities this often. Set to 0 to disable
    /// the resync loop.
    #[clap(long, default_value_t = 0)]
    pub resync_interval_secs: u64,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<()> {
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
        .unwrap();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(
        CliConfig {
            entity_db_path: cli_args.entity_db,
            graph_db_path: cli_args.graph_db,
            read_pool_size: cli_args.read_pool_size,
            query_timeout_ms: cli_args.query_timeout_ms,
            resync_interval_secs: cli_args.resync_interval_secs,
        },
        file_config,
    );

    info!(
        "Opening SQLite entity database at {:?}...",
        config.entity_db_path
    );
    let store = Arc::new(SqliteEntityStore::new(
        &config.entity_db_path,
        config.read_pool_size,
    )?);

    info!(
        "Opening SQLite graph mirror at {:?}...",
        config.graph_db_path
    );
    let mirror = Arc::new(SqliteGraphMirror::new(
        &config.graph_db_path,
        config.read_pool_size,
        config.query_timeout,
    )?);

    let service = Arc::new(CatalogService::new(store, mirror));

    if cli_args.rebuild {
        info!("Rebuilding graph mirror from the entity store...");
        let stats = service.rebuild_mirror()?;
        info!(
            "Rebuild complete: {} artists, {} albums, {} tracks, {} edges",
            stats.artists, stats.albums, stats.tracks, stats.edges
        );
    }

    let stats = service.stats()?;
    info!(
        "Catalog: {} artists, {} albums, {} tracks; mirror: {} nodes, {} edges",
        stats.artists, stats.albums, stats.tracks, stats.mirror_nodes, stats.mirror_edges
    );

    if config.resync_interval.is_zero() {
        return Ok(());
    }

    info!(
        "Resync loop enabled: re-mirroring updated entities every {:?}",
        config.resync_interval
    );
    let mut watermark = unix_now();
    let mut ticker = tokio::time::interval(config.resync_interval);

    // Skip the first immediate tick, wait for the first interval
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let tick_started = unix_now();
        match service.resync_updated_since(watermark) {
            Ok(count) => {
                if count > 0 {
                    info!("Resynced {} updated entities", count);
                }
                watermark = tick_started;
            }
            Err(e) => {
                error!("Resync failed, keeping watermark {}: {}", watermark, e);
            }
        }
    }
}
