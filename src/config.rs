//! Configuration management for Jellycord
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from the YAML config file, environment variables,
//! and CLI overrides.

use crate::error::{JellycordError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Minimum allowed refresh interval, enforced on every poll loop
pub const REFRESH_FLOOR_SECONDS: u64 = 5;

/// Main configuration structure for Jellycord
///
/// This structure holds all configuration needed for the bot,
/// including the media server connection, Discord settings, and
/// per-field display toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General behavior configuration (refresh cadence)
    #[serde(default)]
    pub general: GeneralConfig,

    /// Media server connection configuration (Emby or Jellyfin)
    pub media_server: MediaServerConfig,

    /// Discord connection and channel configuration
    pub discord: DiscordConfig,

    /// Display toggles consulted by the renderer
    #[serde(default)]
    pub display: DisplayConfig,

    /// Health endpoint configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// General behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Seconds between now-playing / recently-added polls
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,

    /// Seconds between library-stats polls (channel renames are a heavier
    /// Discord operation, so this cadence is much coarser)
    #[serde(default = "default_library_refresh_seconds")]
    pub library_refresh_seconds: u64,
}

fn default_refresh_seconds() -> u64 {
    5
}

fn default_library_refresh_seconds() -> u64 {
    3600
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            refresh_seconds: default_refresh_seconds(),
            library_refresh_seconds: default_library_refresh_seconds(),
        }
    }
}

impl GeneralConfig {
    /// Poll interval for the now-playing and recently-added passes,
    /// clamped to the enforced floor
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(clamp_to_floor(self.refresh_seconds, "refresh_seconds"))
    }

    /// Poll interval for the library-stats pass, clamped to the enforced floor
    pub fn library_refresh_interval(&self) -> Duration {
        Duration::from_secs(clamp_to_floor(
            self.library_refresh_seconds,
            "library_refresh_seconds",
        ))
    }
}

fn clamp_to_floor(seconds: u64, field: &str) -> u64 {
    if seconds < REFRESH_FLOOR_SECONDS {
        tracing::warn!(
            "{} = {}s is below the {}s floor, clamping",
            field,
            seconds,
            REFRESH_FLOOR_SECONDS
        );
        REFRESH_FLOOR_SECONDS
    } else {
        seconds
    }
}

/// Media server connection configuration
///
/// Covers both Emby and Jellyfin; `type` selects the client implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaServerConfig {
    /// Which media server to poll ("emby" or "jellyfin")
    #[serde(rename = "type", default = "default_server_kind")]
    pub kind: String,

    /// Base URL of the media server (e.g. http://localhost:8096)
    pub url: String,

    /// API key for authentication
    pub api_key: String,

    /// User ID used for user-scoped endpoints
    ///
    /// May be left empty; the client resolves it at startup, preferring
    /// an administrator account.
    #[serde(default)]
    pub user_id: String,

    /// Accept self-signed TLS certificates from the media server
    #[serde(default)]
    pub use_self_signed_cert: bool,
}

fn default_server_kind() -> String {
    "emby".to_string()
}

impl Default for MediaServerConfig {
    fn default() -> Self {
        Self {
            kind: default_server_kind(),
            url: "http://localhost:8096".to_string(),
            api_key: String::new(),
            user_id: String::new(),
            use_self_signed_cert: false,
        }
    }
}

/// Discord connection and channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token
    pub bot_token: String,

    /// Guild (server) ID the bot operates in
    pub server_id: String,

    /// Category the library-stat voice channels and the recently-added
    /// channel are created under
    #[serde(default)]
    pub library_stats_category_id: String,

    /// Base name of the now-playing text channel (emoji prefix is added)
    #[serde(default = "default_now_playing_channel")]
    pub now_playing_channel: String,

    /// Base name of the recently-added text channel (emoji prefix is added)
    #[serde(default = "default_recently_added_channel")]
    pub recently_added_channel: String,

    /// Embed color as a hex string (e.g. "7289DA")
    #[serde(default = "default_embed_color")]
    pub embed_color: String,
}

fn default_now_playing_channel() -> String {
    "now-playing".to_string()
}

fn default_recently_added_channel() -> String {
    "recently-added".to_string()
}

fn default_embed_color() -> String {
    "7289DA".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            server_id: String::new(),
            library_stats_category_id: String::new(),
            now_playing_channel: default_now_playing_channel(),
            recently_added_channel: default_recently_added_channel(),
            embed_color: default_embed_color(),
        }
    }
}

impl DiscordConfig {
    /// Embed color parsed from the configured hex string
    pub fn embed_color_value(&self) -> Result<u32> {
        u32::from_str_radix(self.embed_color.trim_start_matches('#'), 16).map_err(|e| {
            JellycordError::Config(format!("Invalid embed_color '{}': {}", self.embed_color, e))
                .into()
        })
    }
}

/// Display toggles consulted by the renderer
///
/// The first three switches enable whole features; the rest control which
/// attributes are rendered per stream in the now-playing panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Enable the now-playing panel
    pub show_current_streams: bool,
    /// Enable the recently-added panel
    pub show_recently_added: bool,
    /// Enable the library-stat voice channels
    pub show_library_counts: bool,

    /// Show the transcode count in the panel summary
    pub show_transcoding_count: bool,
    /// Show the total bandwidth in the panel summary
    pub show_bandwidth: bool,

    /// Show the play/pause state per stream
    pub show_stream_state: bool,
    /// Show the media type emoji per stream
    pub show_media_type: bool,
    /// Show the watching user per stream
    pub show_user: bool,
    /// Show the media title per stream
    pub show_media_title: bool,
    /// Show client and device info per stream
    pub show_player_info: bool,
    /// Show the stream quality per stream
    pub show_quality_profile: bool,
    /// Show per-stream bandwidth
    pub show_bandwidth_per_stream: bool,
    /// Show whether the stream is transcoding
    pub show_transcoding_status: bool,
    /// Show elapsed/total progress per stream
    pub show_progress: bool,
    /// Show remaining time per stream
    pub show_eta: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_current_streams: true,
            show_recently_added: true,
            show_library_counts: false,
            show_transcoding_count: false,
            show_bandwidth: false,
            show_stream_state: true,
            show_media_type: true,
            show_user: true,
            show_media_title: true,
            show_player_info: true,
            show_quality_profile: true,
            show_bandwidth_per_stream: false,
            show_transcoding_status: true,
            show_progress: true,
            show_eta: true,
        }
    }
}

/// Health endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Serve the /ping, /hello and /health routes
    pub enable: bool,

    /// Bind address for the health endpoint
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: false,
            bind: "0.0.0.0:8283".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| JellycordError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| JellycordError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(kind) = std::env::var("JELLYCORD_MEDIA_SERVER_TYPE") {
            self.media_server.kind = kind;
        }

        if let Ok(url) = std::env::var("JELLYCORD_MEDIA_SERVER_URL") {
            self.media_server.url = url;
        }

        if let Ok(api_key) = std::env::var("JELLYCORD_MEDIA_SERVER_API_KEY") {
            self.media_server.api_key = api_key;
        }

        if let Ok(token) = std::env::var("JELLYCORD_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = token;
        }

        if let Ok(server_id) = std::env::var("JELLYCORD_DISCORD_SERVER_ID") {
            self.discord.server_id = server_id;
        }

        if let Ok(refresh) = std::env::var("JELLYCORD_REFRESH_SECONDS") {
            if let Ok(value) = refresh.parse() {
                self.general.refresh_seconds = value;
            } else {
                tracing::warn!("Invalid JELLYCORD_REFRESH_SECONDS: {}", refresh);
            }
        }

        if let Ok(refresh) = std::env::var("JELLYCORD_LIBRARY_REFRESH_SECONDS") {
            if let Ok(value) = refresh.parse() {
                self.general.library_refresh_seconds = value;
            } else {
                tracing::warn!("Invalid JELLYCORD_LIBRARY_REFRESH_SECONDS: {}", refresh);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(kind) = &cli.media_server {
            self.media_server.kind = kind.clone();
        }
    }

    /// Validate the configuration before startup
    ///
    /// # Errors
    ///
    /// Returns `JellycordError::Config` describing the first invalid field.
    /// Validation failures abort the process before the poll loop starts.
    pub fn validate(&self) -> Result<()> {
        let valid_kinds = ["emby", "jellyfin"];
        if !valid_kinds.contains(&self.media_server.kind.as_str()) {
            return Err(JellycordError::Config(format!(
                "Invalid media server type: {}. Must be one of: {}",
                self.media_server.kind,
                valid_kinds.join(", ")
            ))
            .into());
        }

        url::Url::parse(&self.media_server.url).map_err(|e| {
            JellycordError::Config(format!(
                "Invalid media server URL '{}': {}",
                self.media_server.url, e
            ))
        })?;

        if self.media_server.api_key.is_empty() {
            return Err(
                JellycordError::Config("media_server.api_key cannot be empty".to_string()).into(),
            );
        }

        if self.discord.bot_token.is_empty() {
            return Err(
                JellycordError::Config("discord.bot_token cannot be empty".to_string()).into(),
            );
        }

        if self.discord.server_id.is_empty() {
            return Err(
                JellycordError::Config("discord.server_id cannot be empty".to_string()).into(),
            );
        }

        if self.display.show_library_counts && self.discord.library_stats_category_id.is_empty() {
            return Err(JellycordError::Config(
                "discord.library_stats_category_id is required when show_library_counts is enabled"
                    .to_string(),
            )
            .into());
        }

        if self.general.refresh_seconds == 0 {
            return Err(
                JellycordError::Config("refresh_seconds must be greater than 0".to_string()).into(),
            );
        }

        if self.general.library_refresh_seconds == 0 {
            return Err(JellycordError::Config(
                "library_refresh_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        self.discord.embed_color_value()?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            media_server: MediaServerConfig::default(),
            discord: DiscordConfig::default(),
            display: DisplayConfig::default(),
            web: WebConfig::default(),
        }
    }
}
