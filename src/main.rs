use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jukebox_server::provider::{
    AppleMusicProvider, MusicProvider, SpotifyProvider, YouTubeProvider,
};
use jukebox_server::queue_store::{QueueStore, SqliteQueueStore};
use jukebox_server::server::{run_server, RequestsLoggingLevel};

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
    /// Path to the SQLite queue database file.
    #[clap(value_parser = parse_path)]
    pub queue_db: PathBuf,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Per-service search timeout in seconds.
    #[clap(long, default_value_t = 10)]
    pub search_timeout_sec: u64,
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

    info!("Opening SQLite queue database at {:?}...", cli_args.queue_db);
    let store: Arc<dyn QueueStore> = Arc::new(SqliteQueueStore::new(&cli_args.queue_db)?);
    store.seed_default_settings()?;

    let providers: Vec<Arc<dyn MusicProvider>> = vec![
        Arc::new(SpotifyProvider::from_env()),
        Arc::new(YouTubeProvider::from_env()),
        Arc::new(AppleMusicProvider::from_env()),
    ];

    info!("Starting jukebox server on port {}...", cli_args.port);
    run_server(
        store,
        providers,
        cli_args.logging_level,
        cli_args.port,
        cli_args.frontend_dir_path,
        Duration::from_secs(cli_args.search_timeout_sec),
    )
    .await
}
