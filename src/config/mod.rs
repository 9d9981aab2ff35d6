mod file_config;

pub use file_config::{FileConfig, SpotifyConfig, TelegramFileConfig, TrackerConfig};

use crate::tracker::TrackerSettings;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 60;
pub const DEFAULT_IMAGE_DEBOUNCE_HOURS: u64 = 24;
pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub poll_interval_minutes: u64,
    pub image_debounce_hours: u64,
    pub suppress_empty_fetch: bool,
    pub request_timeout_sec: u64,
    pub webhook_secret: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub utc_offset_hours: i32,
    pub disable_telegram_commands: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_dir: None,
            port: DEFAULT_PORT,
            poll_interval_minutes: DEFAULT_POLL_INTERVAL_MINUTES,
            image_debounce_hours: DEFAULT_IMAGE_DEBOUNCE_HOURS,
            suppress_empty_fetch: false,
            request_timeout_sec: DEFAULT_REQUEST_TIMEOUT_SEC,
            webhook_secret: None,
            spotify_client_id: None,
            spotify_client_secret: None,
            telegram_bot_token: None,
            telegram_chat_id: None,
            utc_offset_hours: 0,
            disable_telegram_commands: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub poll_interval_minutes: u64,
    pub request_timeout_sec: u64,
    pub webhook_secret: Option<String>,

    // Feature configs
    pub tracker: TrackerSettings,
    pub spotify: Option<SpotifySettings>,
    pub telegram: Option<TelegramSettings>,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
    pub utc_offset_hours: i32,
    /// Answer operator commands sent to the chat.
    pub commands_enabled: bool,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let poll_interval_minutes = file
            .poll_interval_minutes
            .unwrap_or(cli.poll_interval_minutes);
        if poll_interval_minutes == 0 {
            bail!("poll_interval_minutes must be greater than zero");
        }
        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        let webhook_secret = file
            .webhook_secret
            .or_else(|| cli.webhook_secret.clone())
            .filter(|s| !s.is_empty());

        let tracker_file = file.tracker.unwrap_or_default();
        let image_debounce_hours = tracker_file
            .image_debounce_hours
            .unwrap_or(cli.image_debounce_hours);
        let tracker = TrackerSettings {
            image_debounce: Duration::from_secs(image_debounce_hours * 3600),
            suppress_empty_fetch: tracker_file
                .suppress_empty_fetch
                .unwrap_or(cli.suppress_empty_fetch),
        };

        let spotify_file = file.spotify.unwrap_or_default();
        let spotify = match (
            spotify_file
                .client_id
                .or_else(|| cli.spotify_client_id.clone()),
            spotify_file
                .client_secret
                .or_else(|| cli.spotify_client_secret.clone()),
        ) {
            (Some(client_id), Some(client_secret)) => Some(SpotifySettings {
                client_id,
                client_secret,
            }),
            (None, None) => None,
            _ => bail!("Both the Spotify client id and client secret must be provided"),
        };

        let telegram_file = file.telegram.unwrap_or_default();
        let utc_offset_hours = telegram_file
            .utc_offset_hours
            .unwrap_or(cli.utc_offset_hours);
        if !(-23..=23).contains(&utc_offset_hours) {
            bail!("utc_offset_hours out of range: {}", utc_offset_hours);
        }
        let commands_enabled = telegram_file
            .commands
            .unwrap_or(!cli.disable_telegram_commands);
        let telegram = match (
            telegram_file
                .bot_token
                .or_else(|| cli.telegram_bot_token.clone()),
            telegram_file
                .chat_id
                .or_else(|| cli.telegram_chat_id.clone()),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings {
                bot_token,
                chat_id,
                utc_offset_hours,
                commands_enabled,
            }),
            (None, None) => None,
            _ => bail!("Both the Telegram bot token and chat id must be provided"),
        };

        Ok(Self {
            db_dir,
            port,
            poll_interval_minutes,
            request_timeout_sec,
            webhook_secret,
            tracker,
            spotify,
            telegram,
        })
    }

    pub fn tracker_db_path(&self) -> PathBuf {
        self.db_dir.join("tracker.db")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_sec)
    }
}
