//! Base media-server trait and common types for Jellycord
//!
//! This module defines the MediaServer trait that all media-server clients
//! must implement, along with the normalized session, recent-item, and
//! library-count types shared by the reconciliation passes.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Emby/Jellyfin report positions and runtimes in 100 ns ticks
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Convert media-server ticks (100 ns units) to whole seconds
pub fn ticks_to_seconds(ticks: u64) -> u64 {
    ticks / TICKS_PER_SECOND
}

/// Media type of a playing or recently added item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Episode,
    Series,
    Season,
    MusicVideo,
    Audio,
    Other,
}

impl MediaType {
    /// Map a raw `Type` string from the Emby/Jellyfin API
    pub fn from_api(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "movie" => MediaType::Movie,
            "episode" => MediaType::Episode,
            "series" => MediaType::Series,
            "season" => MediaType::Season,
            "musicvideo" => MediaType::MusicVideo,
            "audio" => MediaType::Audio,
            _ => MediaType::Other,
        }
    }
}

/// Playback state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Playing,
    Paused,
    Stopped,
}

impl PlayState {
    /// Human-readable label used in the now-playing panel
    pub fn label(&self) -> &'static str {
        match self {
            PlayState::Playing => "Playing",
            PlayState::Paused => "Paused",
            PlayState::Stopped => "Stopped",
        }
    }
}

/// One active playback stream reported by the media server
///
/// Ephemeral: rebuilt from scratch on every poll, identified across
/// polls only by `session_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier assigned by the media server
    pub session_id: String,
    /// Name of the watching user
    pub user: String,
    /// Media type of the playing item
    pub media_type: MediaType,
    /// Display title (episodes are formatted `Series - SxxEyy - Name`)
    pub title: String,
    /// Client application (e.g. "Emby Web")
    pub product: String,
    /// Device the client runs on
    pub player: String,
    /// Stream quality summary (resolution, bitrate, codec)
    pub quality: String,
    /// Playback position in seconds
    pub position_secs: u64,
    /// Total runtime in seconds (0 when unknown)
    pub runtime_secs: u64,
    /// Current playback state
    pub state: PlayState,
    /// Whether the server is transcoding this stream
    pub transcoding: bool,
    /// Stream bandwidth in bits per second (0 when unknown)
    pub bandwidth_bps: u64,
}

/// Display grouping for recently added items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Movies,
    TvShows,
    Music,
    Other,
}

impl Category {
    /// Group heading used in the recently-added panel
    pub fn label(&self) -> &'static str {
        match self {
            Category::Movies => "Movies",
            Category::TvShows => "TV Shows",
            Category::Music => "Music",
            Category::Other => "Other",
        }
    }
}

/// A recently added media entry
///
/// Immutable once fetched; ordering and truncation happen in the
/// recently-added pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentItem {
    /// Stable item identifier from the media server
    pub id: String,
    /// Display title (episodes are formatted `Series - SxxEyy - Name`)
    pub title: String,
    /// Media type of the item
    pub media_type: MediaType,
    /// When the item was added to the library (UTC)
    pub added: DateTime<Utc>,
}

impl RecentItem {
    /// Display grouping derived from the media type
    pub fn category(&self) -> Category {
        match self.media_type {
            MediaType::Movie => Category::Movies,
            MediaType::Episode | MediaType::Series | MediaType::Season => Category::TvShows,
            MediaType::Audio | MediaType::MusicVideo => Category::Music,
            MediaType::Other => Category::Other,
        }
    }
}

/// Collection type of a media library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Movies,
    TvShows,
    Music,
}

impl CollectionType {
    /// Map a raw `CollectionType` string from the API; `None` for library
    /// kinds the bot does not track (collections, playlists, photos)
    pub fn from_api(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "movies" => Some(CollectionType::Movies),
            "tvshows" => Some(CollectionType::TvShows),
            "music" => Some(CollectionType::Music),
            _ => None,
        }
    }
}

/// One library's item tally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryCount {
    /// Library name as configured on the media server
    pub name: String,
    /// Library collection type
    pub collection_type: CollectionType,
    /// Number of items in the library
    pub count: u64,
    /// Name marks the library as 4K content
    pub is_4k: bool,
    /// Name marks the library as kids content
    pub is_kids: bool,
    /// Name marks the library as anime content
    pub is_anime: bool,
}

/// Derive the 4K/Kids/Anime flags from a library name
pub fn library_flags(name: &str) -> (bool, bool, bool) {
    let lower = name.to_lowercase();
    (
        lower.contains("4k"),
        lower.contains("kids"),
        lower.contains("anime"),
    )
}

/// Basic identity of the media server, fetched at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server display name
    pub name: String,
    /// Server software version
    pub version: String,
}

/// Trait implemented by media-server clients (Emby, Jellyfin)
///
/// Implementations are stateless request/response collaborators: the
/// reconciliation passes own all display state. Every method fails with
/// `JellycordError::SourceUnavailable` on network or auth errors, which
/// the passes catch and retry on the next tick.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Short name of the server kind ("emby" or "jellyfin")
    fn kind(&self) -> &'static str;

    /// Startup hook: verify connectivity and resolve the user id when the
    /// configuration omitted it
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the server cannot be reached or no
    /// usable user account is found. Startup aborts on this error.
    async fn prepare(&self) -> Result<ServerInfo>;

    /// Fetch all sessions with an item currently playing
    async fn fetch_active_sessions(&self) -> Result<Vec<Session>>;

    /// Fetch recently added items, newest first
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of items to request from the server
    async fn fetch_recent_items(&self, limit: usize) -> Result<Vec<RecentItem>>;

    /// Fetch per-library item counts
    async fn fetch_library_counts(&self) -> Result<Vec<LibraryCount>>;
}
