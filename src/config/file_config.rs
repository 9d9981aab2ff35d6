use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub poll_interval_minutes: Option<u64>,
    pub request_timeout_sec: Option<u64>,
    pub webhook_secret: Option<String>,

    // Feature configs
    pub tracker: Option<TrackerConfig>,
    pub spotify: Option<SpotifyConfig>,
    pub telegram: Option<TelegramFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TrackerConfig {
    pub image_debounce_hours: Option<u64>,
    pub suppress_empty_fetch: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct TelegramFileConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub utc_offset_hours: Option<i32>,
    pub commands: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
db_dir = "/var/lib/tracker"
port = 8080
poll_interval_minutes = 15

[tracker]
image_debounce_hours = 12
suppress_empty_fetch = true

[spotify]
client_id = "id"
client_secret = "secret"

[telegram]
bot_token = "123:abc"
chat_id = "-100"
utc_offset_hours = 8
commands = false
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.db_dir.as_deref(), Some("/var/lib/tracker"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.poll_interval_minutes, Some(15));
        let tracker = config.tracker.unwrap();
        assert_eq!(tracker.image_debounce_hours, Some(12));
        assert_eq!(tracker.suppress_empty_fetch, Some(true));
        assert_eq!(config.spotify.unwrap().client_id.as_deref(), Some("id"));
        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.utc_offset_hours, Some(8));
        assert_eq!(telegram.commands, Some(false));
    }

    #[test]
    fn test_load_empty_config() {
        let file = NamedTempFile::new().unwrap();
        let config = FileConfig::load(file.path()).unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.spotify.is_none());
    }

    #[test]
    fn test_load_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }
}
