//! Configuration management for the memo archive.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present). The channel→tag mapping used by the importer is parsed from
//! `SLACK_CHANNELS`:
//!
//! ```text
//! SLACK_CHANNELS=C036Q96KBEZ=1,C036Q9SP6S1=2,C_NEWS=!,C_RANDOM=
//! ```
//!
//! Each entry is `channel_id=tag_id`. An empty tag id means the channel has
//! no tag; a trailing `!` imports every post of the channel regardless of
//! reactions.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use crate::{Error, Result};

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize configuration (call once at startup).
///
/// Fails when a variable is present but cannot be parsed, so a bad value
/// stops the process instead of running with a silently defaulted setting.
pub fn init() -> Result<&'static Config> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::from_env()?;
    Ok(CONFIG.get_or_init(|| config))
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub slack: SlackConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    pub channels: ChannelTagMap,
    /// Posts carrying a reaction whose name contains this are archived.
    pub archive_reaction: String,
    /// Upper bound on the external fetch for one channel or thread.
    pub fetch_timeout: Duration,
    /// Maximum number of cursor pages followed per API call.
    pub max_pages: usize,
    /// Directory holding exported channel history files (`*.json`).
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
}

/// One archived channel and the tag its posts receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub channel_id: String,
    pub tag_id: Option<i64>,
    /// Import every post, not just the ones carrying the archive reaction.
    pub force_import: bool,
}

/// Static channel→tag mapping handed to the importer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelTagMap {
    channels: Vec<ChannelConfig>,
}

impl ChannelTagMap {
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    pub fn find(&self, channel_id: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.channel_id == channel_id)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl FromStr for ChannelTagMap {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut channels = Vec::new();

        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (channel_id, rest) = entry.split_once('=').unwrap_or((entry, ""));
            let channel_id = channel_id.trim();
            if channel_id.is_empty() {
                return Err(Error::Config(format!("Missing channel id in '{}'", entry)));
            }

            let rest = rest.trim();
            let (tag, force_import) = match rest.strip_suffix('!') {
                Some(tag) => (tag.trim(), true),
                None => (rest, false),
            };

            let tag_id = if tag.is_empty() {
                None
            } else {
                Some(tag.parse::<i64>().map_err(|_| {
                    Error::Config(format!("Invalid tag id '{}' for channel {}", tag, channel_id))
                })?)
            };

            channels.push(ChannelConfig {
                channel_id: channel_id.to_string(),
                tag_id,
                force_import,
            });
        }

        Ok(Self { channels })
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(lookup);

        let channels = match vars.get("SLACK_CHANNELS") {
            Some(raw) => raw
                .parse::<ChannelTagMap>()
                .map_err(|e| match e {
                    Error::Config(message) => Error::Config(format!("SLACK_CHANNELS: {}", message)),
                    other => other,
                })?,
            None => ChannelTagMap::default(),
        };

        let log_format = match vars.or("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(Error::Config(format!(
                    "LOG_FORMAT: expected 'json' or 'pretty', got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            server: ServerConfig {
                host: vars.or("HOST", "0.0.0.0"),
                port: vars.parse("PORT", 3000)?,
                request_timeout: Duration::from_secs(vars.parse("REQUEST_TIMEOUT_SECS", 120)?),
            },
            database: DatabaseConfig {
                path: vars.or("DATABASE_PATH", "./data/memo-archive.db"),
            },
            slack: SlackConfig {
                api_token: vars.get("SLACK_API_TOKEN").filter(|t| !t.is_empty()),
                base_url: vars.or("SLACK_API_BASE_URL", "https://slack.com/api"),
                channels,
                archive_reaction: vars.or("SLACK_ARCHIVE_REACTION", "archive"),
                fetch_timeout: Duration::from_secs(vars.parse("SLACK_FETCH_TIMEOUT_SECS", 30)?),
                max_pages: vars.parse("SLACK_MAX_PAGES", 10)?,
                export_dir: PathBuf::from(vars.or("SLACK_EXPORT_DIR", "./data/import_files")),
            },
            log: LogConfig { format: log_format },
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{}: invalid value '{}'", key, raw))),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_channel_map_parsing() {
        let map: ChannelTagMap = "C1=1, C2=2!,C3=,C4=!".parse().unwrap();
        assert_eq!(map.channels().len(), 4);
        assert_eq!(
            map.channels()[1],
            ChannelConfig {
                channel_id: "C2".into(),
                tag_id: Some(2),
                force_import: true,
            }
        );
        assert_eq!(map.find("C1").and_then(|c| c.tag_id), Some(1));
        assert_eq!(map.find("C3").map(|c| c.tag_id), Some(None));
        assert!(map.channels()[3].force_import);
        assert_eq!(map.channels()[3].tag_id, None);
        assert!(map.find("unknown").is_none());
    }

    #[test]
    fn test_channel_map_rejects_bad_tag() {
        assert!("C1=abc".parse::<ChannelTagMap>().is_err());
        assert!("=1".parse::<ChannelTagMap>().is_err());
    }

    #[test]
    fn test_empty_channel_map() {
        let map: ChannelTagMap = "".parse().unwrap();
        assert!(map.is_empty());
    }

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.slack.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.slack.max_pages, 10);
        assert!(config.slack.channels.is_empty());
        assert!(config.slack.api_token.is_none());
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("SLACK_CHANNELS", "C1=1,C2=!"),
            ("SLACK_API_TOKEN", "xoxb-1"),
            ("SLACK_EXPORT_DIR", "/tmp/export"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.slack.channels.channels().len(), 2);
        assert_eq!(config.slack.api_token.as_deref(), Some("xoxb-1"));
        assert_eq!(config.slack.export_dir, PathBuf::from("/tmp/export"));
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_channel_map_fails_configuration() {
        let result = Config::from_lookup(lookup(&[("SLACK_CHANNELS", "C1=abc")]));
        match result {
            Err(Error::Config(message)) => assert!(message.contains("SLACK_CHANNELS")),
            other => panic!("expected a config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_number_fails_configuration() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "eighty")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("SLACK_FETCH_TIMEOUT_SECS", "-1")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("LOG_FORMAT", "xml")])),
            Err(Error::Config(_))
        ));
    }
}
