//! Emby client implementation for Jellycord
//!
//! This module implements the MediaServer trait for Emby, normalizing
//! sessions, recently added items, and library counts into the common
//! shape consumed by the reconciliation passes. The user id used for
//! user-scoped endpoints is resolved at startup when not configured.

use crate::config::MediaServerConfig;
use crate::error::{JellycordError, Result};
use crate::sources::{
    library_flags, ticks_to_seconds, CollectionType, LibraryCount, MediaServer, MediaType,
    PlayState, RecentItem, ServerInfo, Session,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Display;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Bound on every request so a hung server cannot stall a pass
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Emby API client
///
/// Connects to an Emby server with an API key and exposes the normalized
/// MediaServer operations. Library counts honor the 4K naming convention
/// by applying width filters, matching how the libraries are curated.
pub struct EmbyClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_id: Arc<RwLock<Option<String>>>,
}

/// Session entry from `/Sessions`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SessionDto {
    #[serde(default)]
    id: String,
    #[serde(default)]
    user_name: Option<String>,
    #[serde(default)]
    client: Option<String>,
    #[serde(default)]
    device_name: Option<String>,
    now_playing_item: Option<NowPlayingDto>,
    play_state: Option<PlayStateDto>,
    transcoding_info: Option<TranscodingDto>,
}

/// The item a session is playing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct NowPlayingDto {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "Type", default)]
    item_type: String,
    #[serde(default)]
    series_name: Option<String>,
    #[serde(default)]
    parent_index_number: Option<u32>,
    #[serde(default)]
    index_number: Option<u32>,
    #[serde(default)]
    run_time_ticks: Option<u64>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    bitrate: Option<u64>,
}

/// Playback position and pause state
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct PlayStateDto {
    #[serde(default)]
    position_ticks: Option<u64>,
    #[serde(default)]
    is_paused: bool,
}

/// Active transcode details
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TranscodingDto {
    #[serde(default)]
    video_codec: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    bitrate: Option<u64>,
}

/// Response from `/Library/MediaFolders`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct MediaFoldersDto {
    #[serde(default)]
    pub(crate) items: Vec<LibraryDto>,
}

/// One library folder
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LibraryDto {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) collection_type: Option<String>,
}

/// Paged item response from `/Items`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ItemsPageDto {
    #[serde(default)]
    pub(crate) total_record_count: u64,
    #[serde(default)]
    pub(crate) items: Vec<RecentItemDto>,
}

/// One recently added item
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RecentItemDto {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "Type", default)]
    item_type: String,
    #[serde(default)]
    series_name: Option<String>,
    #[serde(default)]
    parent_index_number: Option<u32>,
    #[serde(default)]
    index_number: Option<u32>,
    #[serde(default)]
    date_created: Option<String>,
}

/// User entry from `/Users`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserDto {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) policy: Option<UserPolicyDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserPolicyDto {
    #[serde(default)]
    pub(crate) is_administrator: bool,
}

/// Response from `/System/Info`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SystemInfoDto {
    #[serde(default)]
    pub(crate) server_name: String,
    #[serde(default)]
    pub(crate) version: String,
}

pub(crate) fn source_err(context: &str, err: impl Display) -> anyhow::Error {
    JellycordError::SourceUnavailable(format!("{}: {}", context, err)).into()
}

impl EmbyClient {
    /// Create a new Emby client
    ///
    /// # Arguments
    ///
    /// * `config` - Media server connection settings
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &MediaServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.use_self_signed_cert)
            .user_agent("jellycord/1.0")
            .build()
            .map_err(|e| {
                JellycordError::SourceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        let user_id = if config.user_id.is_empty() {
            None
        } else {
            Some(config.user_id.clone())
        };

        tracing::info!("Initialized Emby client: url={}", config.url);

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            user_id: Arc::new(RwLock::new(user_id)),
        })
    }

    /// The resolved user id, if known
    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().ok().and_then(|id| id.clone())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Emby request");

        let response = self
            .client
            .get(&url)
            .header("X-Emby-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| source_err(path, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(source_err(
                path,
                format!("status {}: {}", status.as_u16(), body),
            ));
        }

        response.json::<T>().await.map_err(|e| source_err(path, e))
    }

    /// Resolve the user id for user-scoped endpoints
    ///
    /// Tries `/Users/Me` for the key's own user, then falls back to the
    /// first administrator in `/Users`, then to the first user.
    async fn resolve_user_id(&self) -> Result<String> {
        if let Ok(user) = self.get_json::<UserDto>("/Users/Me", &[]).await {
            if !user.id.is_empty() {
                return Ok(user.id);
            }
        }

        let users: Vec<UserDto> = self.get_json("/Users", &[]).await?;
        let admin = users
            .iter()
            .find(|u| u.policy.as_ref().is_some_and(|p| p.is_administrator));
        admin
            .or(users.first())
            .map(|u| u.id.clone())
            .ok_or_else(|| {
                JellycordError::SourceUnavailable("No usable Emby user account found".to_string())
                    .into()
            })
    }

    async fn ensure_user_id(&self) -> Result<String> {
        if let Some(id) = self.user_id() {
            return Ok(id);
        }

        let id = self.resolve_user_id().await?;
        tracing::info!("Resolved Emby user id: {}", id);
        if let Ok(mut slot) = self.user_id.write() {
            *slot = Some(id.clone());
        }
        Ok(id)
    }

    fn count_query(library: &LibraryDto, collection_type: CollectionType) -> Vec<(&'static str, String)> {
        let (is_4k, is_kids, is_anime) = library_flags(&library.name);

        let mut query = vec![
            ("ParentId", library.id.clone()),
            ("Recursive", "true".to_string()),
            ("ImageTypeLimit", "0".to_string()),
        ];

        // 4K libraries count only 4K-wide items; plain movie/show libraries
        // exclude them. Kids and anime libraries are mixed-resolution.
        if is_4k {
            query.push(("MinWidth", "3840".to_string()));
        } else if !(is_kids || is_anime) {
            query.push(("MaxWidth", "3839".to_string()));
        }

        let item_types = match collection_type {
            CollectionType::Movies => "Movie",
            CollectionType::TvShows => "Series",
            CollectionType::Music => "Audio,MusicAlbum",
        };
        query.push(("IncludeItemTypes", item_types.to_string()));

        query
    }
}

/// Build the display title, formatting episodes as `Series - SxxEyy - Name`
pub(crate) fn format_title(
    media_type: MediaType,
    name: Option<&str>,
    series_name: Option<&str>,
    season: Option<u32>,
    episode: Option<u32>,
) -> String {
    let name = name.unwrap_or("Unknown");
    if media_type == MediaType::Episode {
        format!(
            "{} - S{:02}E{:02} - {}",
            series_name.unwrap_or(""),
            season.unwrap_or(0),
            episode.unwrap_or(0),
            name
        )
    } else {
        name.to_string()
    }
}

/// Quality summary: resolution plus bitrate, marking direct play
fn format_quality(
    transcoding: Option<&TranscodingDto>,
    item: &NowPlayingDto,
) -> String {
    match transcoding {
        Some(t) => {
            let (width, height) = (t.width.unwrap_or(0), t.height.unwrap_or(0));
            if width == 0 || height == 0 {
                return "Unknown".to_string();
            }
            let mut quality = format!("{}x{}", width, height);
            if let Some(bitrate) = t.bitrate {
                quality.push_str(&format!(" {:.1}Mbps", bitrate as f64 / 1_000_000.0));
            }
            if let Some(codec) = &t.video_codec {
                quality.push_str(&format!(" ({})", codec));
            }
            quality
        }
        None => {
            let (width, height) = (item.width.unwrap_or(0), item.height.unwrap_or(0));
            if width == 0 || height == 0 {
                return "Direct".to_string();
            }
            let mut quality = format!("{}x{}", width, height);
            if let Some(bitrate) = item.bitrate {
                quality.push_str(&format!(" {:.1}Mbps", bitrate as f64 / 1_000_000.0));
            }
            quality.push_str(" (direct)");
            quality
        }
    }
}

/// Normalize one `/Sessions` entry; `None` when nothing is playing
pub(crate) fn parse_session(dto: SessionDto) -> Option<Session> {
    let item = dto.now_playing_item?;
    let play_state = dto.play_state.as_ref();

    let media_type = MediaType::from_api(&item.item_type);
    let title = format_title(
        media_type,
        item.name.as_deref(),
        item.series_name.as_deref(),
        item.parent_index_number,
        item.index_number,
    );
    let quality = format_quality(dto.transcoding_info.as_ref(), &item);

    let state = if play_state.is_some_and(|p| p.is_paused) {
        PlayState::Paused
    } else {
        PlayState::Playing
    };

    Some(Session {
        session_id: dto.id,
        user: dto.user_name.unwrap_or_else(|| "Unknown".to_string()),
        media_type,
        title,
        product: dto.client.unwrap_or_else(|| "Unknown".to_string()),
        player: dto.device_name.unwrap_or_else(|| "Unknown".to_string()),
        quality,
        position_secs: ticks_to_seconds(
            play_state.and_then(|p| p.position_ticks).unwrap_or(0),
        ),
        runtime_secs: ticks_to_seconds(item.run_time_ticks.unwrap_or(0)),
        state,
        transcoding: dto.transcoding_info.is_some(),
        bandwidth_bps: dto
            .transcoding_info
            .as_ref()
            .and_then(|t| t.bitrate)
            .unwrap_or(0),
    })
}

/// Normalize one recently added item; `None` without a parseable timestamp
pub(crate) fn parse_recent_item(dto: RecentItemDto) -> Option<RecentItem> {
    let added = dto
        .date_created
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))?;

    let media_type = MediaType::from_api(&dto.item_type);
    let title = format_title(
        media_type,
        dto.name.as_deref(),
        dto.series_name.as_deref(),
        dto.parent_index_number,
        dto.index_number,
    );

    Some(RecentItem {
        id: dto.id,
        title,
        media_type,
        added,
    })
}

#[async_trait]
impl MediaServer for EmbyClient {
    fn kind(&self) -> &'static str {
        "emby"
    }

    async fn prepare(&self) -> Result<ServerInfo> {
        let info: SystemInfoDto = self.get_json("/System/Info", &[]).await?;
        self.ensure_user_id().await?;

        Ok(ServerInfo {
            name: info.server_name,
            version: info.version,
        })
    }

    async fn fetch_active_sessions(&self) -> Result<Vec<Session>> {
        let sessions: Vec<SessionDto> = self.get_json("/Sessions", &[]).await?;
        let active: Vec<Session> = sessions.into_iter().filter_map(parse_session).collect();
        tracing::debug!("Emby reported {} active sessions", active.len());
        Ok(active)
    }

    async fn fetch_recent_items(&self, limit: usize) -> Result<Vec<RecentItem>> {
        let user_id = self.ensure_user_id().await?;

        let query = [
            ("Limit", limit.to_string()),
            ("Fields", "DateCreated".to_string()),
            ("SortBy", "DateCreated,SortName".to_string()),
            ("SortOrder", "Descending".to_string()),
            ("Recursive", "true".to_string()),
            (
                "IncludeItemTypes",
                "Movie,Episode,Series,Season,MusicVideo,Audio".to_string(),
            ),
            ("ImageTypeLimit", "0".to_string()),
        ];
        let query: Vec<(&str, String)> = query.to_vec();

        // The Latest endpoint returns a bare array; fall back to the paged
        // Items endpoint when it comes back empty.
        let latest: Vec<RecentItemDto> = self
            .get_json(&format!("/Users/{}/Items/Latest", user_id), &query)
            .await?;

        let items = if latest.is_empty() {
            let page: ItemsPageDto = self
                .get_json(&format!("/Users/{}/Items", user_id), &query)
                .await?;
            page.items
        } else {
            latest
        };

        Ok(items.into_iter().filter_map(parse_recent_item).collect())
    }

    async fn fetch_library_counts(&self) -> Result<Vec<LibraryCount>> {
        let folders: MediaFoldersDto = self.get_json("/Library/MediaFolders", &[]).await?;

        let mut counts = Vec::new();
        for library in folders.items {
            if library.name.eq_ignore_ascii_case("collections") {
                continue;
            }

            let Some(collection_type) = library
                .collection_type
                .as_deref()
                .and_then(CollectionType::from_api)
            else {
                continue;
            };

            let query = Self::count_query(&library, collection_type);
            let page: ItemsPageDto = match self.get_json("/Items", &query).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Skipping library '{}': {}", library.name, e);
                    continue;
                }
            };

            let mut total = page.total_record_count;

            // Width metadata can be missing on series; retry without the
            // resolution filter before reporting an empty show library.
            if total == 0 && collection_type == CollectionType::TvShows {
                let retry_query = vec![
                    ("ParentId", library.id.clone()),
                    ("Recursive", "true".to_string()),
                    ("IncludeItemTypes", "Series".to_string()),
                    ("ImageTypeLimit", "0".to_string()),
                ];
                if let Ok(page) = self.get_json::<ItemsPageDto>("/Items", &retry_query).await {
                    total = page.total_record_count;
                }
            }

            let (is_4k, is_kids, is_anime) = library_flags(&library.name);
            counts.push(LibraryCount {
                name: library.name,
                collection_type,
                count: total,
                is_4k,
                is_kids,
                is_anime,
            });
        }

        tracing::debug!("Emby reported {} library counts", counts.len());
        Ok(counts)
    }
}
