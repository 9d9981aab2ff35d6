use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use playlist_tracker::background_jobs::jobs::telegram_commands::DEFAULT_POLL_TIMEOUT;
use playlist_tracker::background_jobs::jobs::{PlaylistCheckJob, TelegramCommandsJob};
use playlist_tracker::background_jobs::JobScheduler;
use playlist_tracker::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_IMAGE_DEBOUNCE_HOURS, DEFAULT_POLL_INTERVAL_MINUTES,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SEC,
};
use playlist_tracker::bot::CommandHandler;
use playlist_tracker::fetcher::SpotifyClient;
use playlist_tracker::notifier::{TelegramApi, TelegramConfig, TelegramNotifier};
use playlist_tracker::server::{metrics, ServerState};
use playlist_tracker::sqlite_persistence::open_tracker_db;
use playlist_tracker::{
    run_server, FetchError, FetchedPlaylist, LogNotifier, Notifier, PlaylistFetcher,
    SqlitePlaylistRegistry, SqliteSnapshotStore, TrackerService,
};

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
#[command(name = "playlist-tracker", about = "Reports changes of tracked Spotify playlists")]
struct CliArgs {
    /// Directory holding the tracker database.
    #[clap(long, env = "TRACKER_DB_DIR", value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Minutes between scheduled playlist checks.
    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL_MINUTES)]
    pub poll_interval_minutes: u64,

    /// Hours an image change must persist before it is reported without a new snapshot token.
    #[clap(long, default_value_t = DEFAULT_IMAGE_DEBOUNCE_HOURS)]
    pub image_debounce_hours: u64,

    /// Treat an empty track list of a non-empty playlist as a failed fetch.
    #[clap(long)]
    pub suppress_empty_fetch: bool,

    /// Timeout in seconds for outgoing HTTP requests.
    #[clap(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SEC)]
    pub request_timeout_sec: u64,

    /// Secret expected in the `token` query parameter of the check trigger.
    #[clap(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,

    #[clap(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    #[clap(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,

    /// UTC offset in hours used for dates in notifications.
    #[clap(long, default_value_t = 0, allow_hyphen_values = true)]
    pub utc_offset_hours: i32,

    /// Do not answer /check, /set, /delete and /list in the Telegram chat.
    #[clap(long)]
    pub disable_telegram_commands: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Serve HTTP and run scheduled checks (default).
    Run,
    /// Run a single check and exit.
    Check,
    /// Start tracking a playlist.
    Add { playlist_id: String },
    /// Stop tracking a playlist and forget its stored state.
    Remove { playlist_id: String },
    /// List tracked playlists.
    List,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            poll_interval_minutes: self.poll_interval_minutes,
            image_debounce_hours: self.image_debounce_hours,
            suppress_empty_fetch: self.suppress_empty_fetch,
            request_timeout_sec: self.request_timeout_sec,
            webhook_secret: self.webhook_secret.clone(),
            spotify_client_id: self.spotify_client_id.clone(),
            spotify_client_secret: self.spotify_client_secret.clone(),
            telegram_bot_token: self.telegram_bot_token.clone(),
            telegram_chat_id: self.telegram_chat_id.clone(),
            utc_offset_hours: self.utc_offset_hours,
            disable_telegram_commands: self.disable_telegram_commands,
        }
    }
}

/// Stands in for the Spotify client when no credentials are configured.
/// Registry commands do not fetch anything.
struct UnconfiguredFetcher;

#[async_trait]
impl PlaylistFetcher for UnconfiguredFetcher {
    async fn fetch_playlist(&self, _playlist_id: &str) -> Result<FetchedPlaylist, FetchError> {
        Err(FetchError::Unauthorized(
            "Spotify credentials are not configured".to_string(),
        ))
    }
}

fn build_service(config: &AppConfig) -> Result<Arc<TrackerService>> {
    let conn = open_tracker_db(config.tracker_db_path())?;

    let fetcher: Arc<dyn PlaylistFetcher> = match &config.spotify {
        Some(spotify) => Arc::new(SpotifyClient::new(
            spotify.client_id.clone(),
            spotify.client_secret.clone(),
            config.request_timeout(),
        )?),
        None => Arc::new(UnconfiguredFetcher),
    };

    let notifier: Arc<dyn Notifier> = match &config.telegram {
        Some(telegram) => {
            info!("Sending notifications to Telegram chat {}", telegram.chat_id);
            Arc::new(TelegramNotifier::new(TelegramConfig {
                bot_token: telegram.bot_token.clone(),
                chat_id: telegram.chat_id.clone(),
                utc_offset_hours: telegram.utc_offset_hours,
                timeout: config.request_timeout(),
            })?)
        }
        None => {
            info!("Telegram is not configured, changes will only be logged");
            Arc::new(LogNotifier)
        }
    };

    Ok(Arc::new(TrackerService::new(
        fetcher,
        Arc::new(SqliteSnapshotStore::new(conn.clone())),
        Arc::new(SqlitePlaylistRegistry::new(conn)),
        notifier,
        config.tracker.clone(),
    )))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}

async fn run(config: AppConfig, service: Arc<TrackerService>) -> Result<()> {
    metrics::init_metrics();

    let shutdown_token = CancellationToken::new();
    cancel_on_ctrl_c(shutdown_token.clone());

    let mut scheduler = JobScheduler::new(shutdown_token.clone());
    scheduler.register_job(Arc::new(PlaylistCheckJob::new(
        service.clone(),
        config.poll_interval(),
    )));
    match &config.telegram {
        Some(telegram) if telegram.commands_enabled => {
            let api = Arc::new(TelegramApi::new(&telegram.bot_token, config.request_timeout())?);
            let handler = CommandHandler::new(service.clone(), api.clone(), telegram.chat_id.clone());
            scheduler.register_job(Arc::new(TelegramCommandsJob::new(
                api,
                handler,
                DEFAULT_POLL_TIMEOUT,
            )));
        }
        Some(_) => info!("Telegram chat commands are disabled"),
        None => {}
    }
    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    if config.webhook_secret.is_none() {
        info!("No webhook secret configured, the HTTP check trigger is disabled");
    }
    let state = ServerState::new(
        service.clone(),
        config.webhook_secret.clone(),
        shutdown_token.clone(),
    );
    let server_result = run_server(state, config.port, shutdown_token.clone()).await;

    // The server may also stop on its own, e.g. when the port is taken
    shutdown_token.cancel();
    if let Err(e) = scheduler_task.await {
        error!("Scheduler task failed: {}", e);
    }
    // A detached pass may still be delivering its events
    service.wait_until_idle().await;
    server_result
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
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let service = build_service(&config)?;

    match cli_args.command.clone().unwrap_or(Command::Run) {
        Command::Run => {
            if config.spotify.is_none() {
                bail!("Spotify client id and secret are required to run the tracker");
            }
            run(config, service).await
        }
        Command::Check => {
            if config.spotify.is_none() {
                bail!("Spotify client id and secret are required to check playlists");
            }
            let token = CancellationToken::new();
            cancel_on_ctrl_c(token.clone());
            let summary = service.run_check(&token).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Add { playlist_id } => {
            if service.add_playlist(&playlist_id).await? {
                println!("Now tracking {}", playlist_id);
            } else {
                println!("{} is already tracked", playlist_id);
            }
            Ok(())
        }
        Command::Remove { playlist_id } => {
            if service.remove_playlist(&playlist_id).await? {
                println!("Stopped tracking {}", playlist_id);
            } else {
                println!("{} is not tracked", playlist_id);
            }
            Ok(())
        }
        Command::List => {
            for playlist in service.list_playlists()? {
                match &playlist.name {
                    Some(name) => println!("{}\t{}", playlist.id, name),
                    None => println!("{}", playlist.id),
                }
            }
            Ok(())
        }
    }
}
