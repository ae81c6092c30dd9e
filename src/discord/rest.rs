//! Discord REST client for Jellycord
//!
//! A thin wrapper over the Discord HTTP API covering exactly the surface
//! the reconciliation passes need: messages, channels, and the auth check.
//! Response statuses are classified into the error taxonomy here so the
//! passes never look at HTTP codes: 404 on an existing resource becomes
//! `StaleResource`, 429 and 5xx are retryable, 401/403 suspend a feature.

use crate::config::DiscordConfig;
use crate::discord::base::{
    ChannelInfo, ChannelKind, ChatSurface, ChatUser, Embed, MessageInfo,
};
use crate::error::{JellycordError, Result};

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Discord REST API base
const API_BASE: &str = "https://discord.com/api/v10";

/// Bound on every request so a hung call cannot stall a pass
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Discord numeric channel types for creation payloads
const CHANNEL_TYPE_TEXT: u8 = 0;
const CHANNEL_TYPE_VOICE: u8 = 2;

/// Discord REST API client
///
/// Never retries internally: a rate-limited or failed call surfaces a
/// retryable error and the scheduler backs off until the next tick.
pub struct DiscordClient {
    client: Client,
    api_base: String,
    token: String,
}

/// Channel payload from the API
#[derive(Debug, Deserialize)]
struct ChannelDto {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    parent_id: Option<String>,
}

impl ChannelDto {
    fn into_info(self) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            name: self.name,
            kind: ChannelKind::from_api(self.kind),
            parent_id: self.parent_id,
        }
    }
}

/// Message payload from the API
#[derive(Debug, Deserialize)]
struct MessageDto {
    id: String,
    author: AuthorDto,
}

#[derive(Debug, Deserialize)]
struct AuthorDto {
    id: String,
}

/// Response from `/users/@me`
#[derive(Debug, Deserialize)]
struct CurrentUserDto {
    id: String,
    username: String,
}

/// Classify a Discord response status into the error taxonomy
fn classify_status(status: StatusCode, context: &str, body: &str) -> JellycordError {
    let code = status.as_u16();
    match code {
        404 => JellycordError::StaleResource(context.to_string()),
        429 => JellycordError::ChatApi {
            status: code,
            retryable: true,
            message: format!("rate limited on {}", context),
        },
        401 | 403 => JellycordError::ChatApi {
            status: code,
            retryable: false,
            message: format!("{}: {}", context, body),
        },
        500..=599 => JellycordError::ChatApi {
            status: code,
            retryable: true,
            message: format!("{}: {}", context, body),
        },
        _ => JellycordError::ChatApi {
            status: code,
            retryable: false,
            message: format!("{}: {}", context, body),
        },
    }
}

impl DiscordClient {
    /// Create a new Discord REST client
    ///
    /// # Arguments
    ///
    /// * `config` - Discord configuration carrying the bot token
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &DiscordConfig) -> Result<Self> {
        Self::with_api_base(config, API_BASE)
    }

    /// Create a client against a custom API base (used by tests to point
    /// at a mock server)
    pub fn with_api_base(config: &DiscordConfig, api_base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("jellycord/1.0")
            .build()
            .map_err(|e| JellycordError::ChatApi {
                status: 0,
                retryable: false,
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let response = self.send(method, path, body).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| JellycordError::Http(e).into())
    }

    async fn request_unit(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<()> {
        self.send(method, path, body).await.map(|_| ())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.api_base, path);
        tracing::debug!(method = %method, url = %url, "Discord request");

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| JellycordError::ChatApi {
            status: 0,
            retryable: true,
            message: format!("{}: {}", path, e),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, path, &body).into());
        }

        Ok(response)
    }

    async fn create_channel(
        &self,
        guild_id: &str,
        name: &str,
        channel_type: u8,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        let mut body = json!({ "name": name, "type": channel_type });
        if let Some(parent) = parent_id {
            body["parent_id"] = json!(parent);
        }

        let dto: ChannelDto = self
            .request(
                Method::POST,
                &format!("/guilds/{}/channels", guild_id),
                Some(&body),
            )
            .await?;
        tracing::info!("Created Discord channel '{}' ({})", dto.name, dto.id);
        Ok(dto.into_info())
    }
}

#[async_trait]
impl ChatSurface for DiscordClient {
    async fn current_user(&self) -> Result<ChatUser> {
        let dto: CurrentUserDto = self.request(Method::GET, "/users/@me", None).await?;
        Ok(ChatUser {
            id: dto.id,
            name: dto.username,
        })
    }

    async fn list_guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelInfo>> {
        let dtos: Vec<ChannelDto> = self
            .request(Method::GET, &format!("/guilds/{}/channels", guild_id), None)
            .await?;
        Ok(dtos.into_iter().map(ChannelDto::into_info).collect())
    }

    async fn create_text_channel(
        &self,
        guild_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        self.create_channel(guild_id, name, CHANNEL_TYPE_TEXT, parent_id)
            .await
    }

    async fn create_voice_channel(
        &self,
        guild_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        self.create_channel(guild_id, name, CHANNEL_TYPE_VOICE, parent_id)
            .await
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()> {
        let body = json!({ "name": name });
        self.request_unit(
            Method::PATCH,
            &format!("/channels/{}", channel_id),
            Some(&body),
        )
        .await
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<()> {
        self.request_unit(Method::DELETE, &format!("/channels/{}", channel_id), None)
            .await
    }

    async fn list_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<MessageInfo>> {
        let dtos: Vec<MessageDto> = self
            .request(
                Method::GET,
                &format!("/channels/{}/messages?limit={}", channel_id, limit),
                None,
            )
            .await?;
        Ok(dtos
            .into_iter()
            .map(|m| MessageInfo {
                id: m.id,
                author_id: m.author.id,
            })
            .collect())
    }

    async fn create_message(&self, channel_id: &str, embed: &Embed) -> Result<MessageInfo> {
        let body = json!({ "embeds": [embed] });
        let dto: MessageDto = self
            .request(
                Method::POST,
                &format!("/channels/{}/messages", channel_id),
                Some(&body),
            )
            .await?;
        Ok(MessageInfo {
            id: dto.id,
            author_id: dto.author.id,
        })
    }

    async fn edit_message(&self, channel_id: &str, message_id: &str, embed: &Embed) -> Result<()> {
        let body = json!({ "embeds": [embed] });
        self.request_unit(
            Method::PATCH,
            &format!("/channels/{}/messages/{}", channel_id, message_id),
            Some(&body),
        )
        .await
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.request_unit(
            Method::DELETE,
            &format!("/channels/{}/messages/{}", channel_id, message_id),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DiscordConfig {
        DiscordConfig {
            bot_token: "token".to_string(),
            server_id: "guild".to_string(),
            ..DiscordConfig::default()
        }
    }

    #[test]
    fn test_discord_client_creation() {
        let client = DiscordClient::new(&test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_classify_status_stale() {
        let error = classify_status(StatusCode::NOT_FOUND, "/channels/1", "");
        assert!(matches!(error, JellycordError::StaleResource(_)));
    }

    #[test]
    fn test_classify_status_rate_limited_is_retryable() {
        let error = classify_status(StatusCode::TOO_MANY_REQUESTS, "/channels/1", "");
        match error {
            JellycordError::ChatApi {
                status, retryable, ..
            } => {
                assert_eq!(status, 429);
                assert!(retryable);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_classify_status_forbidden_is_fatal() {
        let error = classify_status(StatusCode::FORBIDDEN, "/channels/1", "missing access");
        assert!(error.is_fatal_for_feature());
    }

    #[test]
    fn test_classify_status_server_error_is_retryable() {
        let error = classify_status(StatusCode::BAD_GATEWAY, "/channels/1", "");
        match error {
            JellycordError::ChatApi { retryable, .. } => assert!(retryable),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_channel_dto_mapping() {
        let dto: ChannelDto = serde_json::from_value(serde_json::json!({
            "id": "123",
            "name": "now-playing",
            "type": 0,
            "parent_id": "456"
        }))
        .unwrap();
        let info = dto.into_info();
        assert_eq!(info.kind, ChannelKind::Text);
        assert_eq!(info.parent_id.as_deref(), Some("456"));
    }
}
