//! Chat surface trait and common types for Jellycord
//!
//! This module defines the ChatSurface trait the reconciliation passes
//! talk to, along with the embed and channel types shared between the
//! Discord REST client and the renderer. Keeping the passes behind this
//! trait lets tests drive them with in-memory fakes.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The bot's own identity, fetched at startup as the auth check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatUser {
    /// Discord user id
    pub id: String,
    /// Username
    pub name: String,
}

/// Channel kind, as far as the bot cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Text,
    Voice,
    Category,
    Other,
}

impl ChannelKind {
    /// Map Discord's numeric channel type
    pub fn from_api(raw: u8) -> Self {
        match raw {
            0 => ChannelKind::Text,
            2 => ChannelKind::Voice,
            4 => ChannelKind::Category,
            _ => ChannelKind::Other,
        }
    }
}

/// A guild channel as seen by the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel id
    pub id: String,
    /// Channel name
    pub name: String,
    /// Channel kind
    pub kind: ChannelKind,
    /// Parent category id, when the channel is grouped
    pub parent_id: Option<String>,
}

/// A message as seen by the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Message id
    pub id: String,
    /// Author's user id
    pub author_id: String,
}

/// An embed ready to send to Discord
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    /// Embed title
    pub title: String,
    /// Embed description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Embed accent color
    pub color: u32,
    /// Embed fields
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<EmbedField>,
    /// Footer text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// ISO-8601 timestamp shown next to the footer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One field in an embed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    /// Field name
    pub name: String,
    /// Field value
    pub value: String,
    /// Render the field inline
    pub inline: bool,
}

/// Embed footer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    /// Footer text
    pub text: String,
}

impl Embed {
    /// Create an embed with a title and accent color
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
            footer: None,
            timestamp: None,
        }
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a non-inline field
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    /// Set the footer text
    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    /// Set the footer timestamp
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Normalize a channel name the way Discord does (lowercase, dashes)
///
/// Used when matching configured channel names against existing channels.
pub fn normalize_channel_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Trait implemented by the Discord REST client (and test fakes)
///
/// A thin create/edit/delete surface over channels and messages. The
/// implementations are stateless; all display state lives in the
/// reconciliation passes. Errors are `JellycordError::ChatApi` with a
/// retryable flag, or `JellycordError::StaleResource` when the target
/// resource no longer exists.
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// The bot's own user, fetched as the startup auth check
    async fn current_user(&self) -> Result<ChatUser>;

    /// List every channel in the guild
    async fn list_guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelInfo>>;

    /// Create a text channel, optionally under a category
    async fn create_text_channel(
        &self,
        guild_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo>;

    /// Create a voice channel, optionally under a category
    async fn create_voice_channel(
        &self,
        guild_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo>;

    /// Rename a channel (a heavy, aggressively rate-limited operation)
    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()>;

    /// Delete a channel
    async fn delete_channel(&self, channel_id: &str) -> Result<()>;

    /// List the most recent messages in a channel, newest first
    async fn list_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<MessageInfo>>;

    /// Send an embed message
    async fn create_message(&self, channel_id: &str, embed: &Embed) -> Result<MessageInfo>;

    /// Edit an embed message in place
    async fn edit_message(&self, channel_id: &str, message_id: &str, embed: &Embed) -> Result<()>;

    /// Delete a message
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;
}
