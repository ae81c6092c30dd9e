//! Media source module for Jellycord
//!
//! This module contains the media-server abstraction and client
//! implementations for Emby and Jellyfin.

pub mod base;
pub mod emby;
pub mod jellyfin;

pub use base::{
    library_flags, ticks_to_seconds, Category, CollectionType, LibraryCount, MediaServer,
    MediaType, PlayState, RecentItem, ServerInfo, Session,
};
pub use emby::EmbyClient;
pub use jellyfin::JellyfinClient;

use crate::config::MediaServerConfig;
use crate::error::Result;
use std::sync::Arc;

/// Create a media-server client based on configuration
///
/// # Arguments
///
/// * `config` - Media server connection settings; `type` selects the
///   implementation ("emby" or "jellyfin")
///
/// # Returns
///
/// Returns a shared client instance
///
/// # Errors
///
/// Returns error if the server type is invalid or initialization fails
pub fn create_media_server(config: &MediaServerConfig) -> Result<Arc<dyn MediaServer>> {
    match config.kind.as_str() {
        "emby" => Ok(Arc::new(EmbyClient::new(config)?)),
        "jellyfin" => Ok(Arc::new(JellyfinClient::new(config)?)),
        _ => Err(crate::error::JellycordError::Config(format!(
            "Unknown media server type: {}",
            config.kind
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(kind: &str) -> MediaServerConfig {
        MediaServerConfig {
            kind: kind.to_string(),
            url: "http://localhost:8096".to_string(),
            api_key: "key".to_string(),
            user_id: String::new(),
            use_self_signed_cert: false,
        }
    }

    #[test]
    fn test_create_media_server_emby() {
        let server = create_media_server(&config_for("emby")).unwrap();
        assert_eq!(server.kind(), "emby");
    }

    #[test]
    fn test_create_media_server_jellyfin() {
        let server = create_media_server(&config_for("jellyfin")).unwrap();
        assert_eq!(server.kind(), "jellyfin");
    }

    #[test]
    fn test_create_media_server_invalid_kind() {
        let result = create_media_server(&config_for("plex"));
        assert!(result.is_err());
    }
}
