//! Jellyfin client implementation for Jellycord
//!
//! Jellyfin inherited Emby's API surface, so this client reuses the wire
//! types and session normalization from the Emby module. It differs in the
//! auth header, in library counting (`/Items/Counts` per library), and in
//! probing for installations served under a `/jellyfin` path prefix.

use crate::config::MediaServerConfig;
use crate::error::{JellycordError, Result};
use crate::sources::emby::{
    parse_recent_item, parse_session, source_err, ItemsPageDto, LibraryDto, MediaFoldersDto,
    SessionDto, SystemInfoDto, UserDto,
};
use crate::sources::{
    library_flags, CollectionType, LibraryCount, MediaServer, RecentItem, ServerInfo, Session,
};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Jellyfin API client
///
/// Some Jellyfin installations are reverse-proxied under a `/jellyfin`
/// prefix; the first successful request pins whichever base URL works.
pub struct JellyfinClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_id: Arc<RwLock<Option<String>>>,
    resolved_base: Arc<RwLock<Option<String>>>,
}

/// Response from `/Items/Counts`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemCountsDto {
    #[serde(default)]
    movie_count: u64,
    #[serde(default)]
    series_count: u64,
    #[serde(default)]
    song_count: u64,
}

impl ItemCountsDto {
    fn for_type(&self, collection_type: CollectionType) -> u64 {
        match collection_type {
            CollectionType::Movies => self.movie_count,
            CollectionType::TvShows => self.series_count,
            CollectionType::Music => self.song_count,
        }
    }
}

impl JellyfinClient {
    /// Create a new Jellyfin client
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

        tracing::info!("Initialized Jellyfin client: url={}", config.url);

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            user_id: Arc::new(RwLock::new(user_id)),
            resolved_base: Arc::new(RwLock::new(None)),
        })
    }

    fn candidate_bases(&self) -> Vec<String> {
        if let Some(base) = self.resolved_base.read().ok().and_then(|b| b.clone()) {
            return vec![base];
        }
        vec![
            self.base_url.clone(),
            format!("{}/jellyfin", self.base_url),
        ]
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut last_err = None;

        for base in self.candidate_bases() {
            let url = format!("{}{}", base, path);
            tracing::debug!(url = %url, "Jellyfin request");

            let response = match self
                .client
                .get(&url)
                .header("X-MediaBrowser-Token", &self.api_key)
                .header("Accept", "application/json")
                .query(query)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_err = Some(source_err(path, e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                last_err = Some(source_err(
                    path,
                    format!("status {}: {}", status.as_u16(), body),
                ));
                continue;
            }

            match response.json::<T>().await {
                Ok(value) => {
                    if let Ok(mut slot) = self.resolved_base.write() {
                        *slot = Some(base);
                    }
                    return Ok(value);
                }
                Err(e) => last_err = Some(source_err(path, e)),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            JellycordError::SourceUnavailable("No Jellyfin base URL responded".to_string()).into()
        }))
    }

    /// Resolve the user id: the first administrator in `/Users`, else the
    /// first user
    async fn resolve_user_id(&self) -> Result<String> {
        let users: Vec<UserDto> = self.get_json("/Users", &[]).await?;
        let admin = users
            .iter()
            .find(|u| u.policy.as_ref().is_some_and(|p| p.is_administrator));
        admin
            .or(users.first())
            .map(|u| u.id.clone())
            .ok_or_else(|| {
                JellycordError::SourceUnavailable(
                    "No usable Jellyfin user account found".to_string(),
                )
                .into()
            })
    }

    async fn ensure_user_id(&self) -> Result<String> {
        if let Some(id) = self.user_id.read().ok().and_then(|id| id.clone()) {
            return Ok(id);
        }

        let id = self.resolve_user_id().await?;
        tracing::info!("Resolved Jellyfin user id: {}", id);
        if let Ok(mut slot) = self.user_id.write() {
            *slot = Some(id.clone());
        }
        Ok(id)
    }
}

#[async_trait]
impl MediaServer for JellyfinClient {
    fn kind(&self) -> &'static str {
        "jellyfin"
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
        tracing::debug!("Jellyfin reported {} active sessions", active.len());
        Ok(active)
    }

    async fn fetch_recent_items(&self, limit: usize) -> Result<Vec<RecentItem>> {
        let user_id = self.ensure_user_id().await?;

        let query: Vec<(&str, String)> = vec![
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

        let page: ItemsPageDto = self
            .get_json(&format!("/Users/{}/Items", user_id), &query)
            .await?;

        Ok(page
            .items
            .into_iter()
            .filter_map(parse_recent_item)
            .collect())
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

            let count = match self.library_item_count(&library, collection_type).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::warn!("Skipping library '{}': {}", library.name, e);
                    continue;
                }
            };

            let (is_4k, is_kids, is_anime) = library_flags(&library.name);
            counts.push(LibraryCount {
                name: library.name,
                collection_type,
                count,
                is_4k,
                is_kids,
                is_anime,
            });
        }

        tracing::debug!("Jellyfin reported {} library counts", counts.len());
        Ok(counts)
    }
}

impl JellyfinClient {
    async fn library_item_count(
        &self,
        library: &LibraryDto,
        collection_type: CollectionType,
    ) -> Result<u64> {
        let query = [("ParentId", library.id.clone())];
        let counts: ItemCountsDto = self.get_json("/Items/Counts", &query).await?;
        Ok(counts.for_type(collection_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> MediaServerConfig {
        MediaServerConfig {
            kind: "jellyfin".to_string(),
            url: "http://localhost:8096/".to_string(),
            api_key: "key".to_string(),
            user_id: String::new(),
            use_self_signed_cert: false,
        }
    }

    #[test]
    fn test_jellyfin_client_creation() {
        let client = JellyfinClient::new(&test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_candidate_bases_before_resolution() {
        let client = JellyfinClient::new(&test_config()).unwrap();
        let bases = client.candidate_bases();
        assert_eq!(
            bases,
            vec![
                "http://localhost:8096".to_string(),
                "http://localhost:8096/jellyfin".to_string(),
            ]
        );
    }

    #[test]
    fn test_candidate_bases_after_resolution() {
        let client = JellyfinClient::new(&test_config()).unwrap();
        *client.resolved_base.write().unwrap() =
            Some("http://localhost:8096/jellyfin".to_string());
        assert_eq!(
            client.candidate_bases(),
            vec!["http://localhost:8096/jellyfin".to_string()]
        );
    }

    #[test]
    fn test_item_counts_by_type() {
        let counts: ItemCountsDto = serde_json::from_value(json!({
            "MovieCount": 120,
            "SeriesCount": 45,
            "SongCount": 900
        }))
        .unwrap();

        assert_eq!(counts.for_type(CollectionType::Movies), 120);
        assert_eq!(counts.for_type(CollectionType::TvShows), 45);
        assert_eq!(counts.for_type(CollectionType::Music), 900);
    }
}
