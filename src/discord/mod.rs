//! Discord module for Jellycord
//!
//! This module contains the chat-surface abstraction, the Discord REST
//! client, and a dry-run wrapper that logs writes instead of sending them.

pub mod base;
pub mod rest;

pub use base::{
    normalize_channel_name, ChannelInfo, ChannelKind, ChatSurface, ChatUser, Embed, EmbedField,
    EmbedFooter, MessageInfo,
};
pub use rest::DiscordClient;

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Chat surface wrapper that performs reads but only logs writes
///
/// Used by the `--dry-run` CLI flag to preview what the bot would do.
/// Write operations return placeholder identifiers so the passes keep
/// their normal create/edit bookkeeping.
pub struct DryRunChat {
    inner: Arc<dyn ChatSurface>,
}

impl DryRunChat {
    /// Wrap a real chat surface
    pub fn new(inner: Arc<dyn ChatSurface>) -> Self {
        Self { inner }
    }

    fn placeholder_message() -> MessageInfo {
        MessageInfo {
            id: "dry-run".to_string(),
            author_id: "dry-run".to_string(),
        }
    }
}

#[async_trait]
impl ChatSurface for DryRunChat {
    async fn current_user(&self) -> Result<ChatUser> {
        self.inner.current_user().await
    }

    async fn list_guild_channels(&self, guild_id: &str) -> Result<Vec<ChannelInfo>> {
        self.inner.list_guild_channels(guild_id).await
    }

    async fn create_text_channel(
        &self,
        _guild_id: &str,
        name: &str,
        _parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        tracing::info!("[dry-run] would create text channel '{}'", name);
        Ok(ChannelInfo {
            id: "dry-run".to_string(),
            name: name.to_string(),
            kind: ChannelKind::Text,
            parent_id: None,
        })
    }

    async fn create_voice_channel(
        &self,
        _guild_id: &str,
        name: &str,
        _parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        tracing::info!("[dry-run] would create voice channel '{}'", name);
        Ok(ChannelInfo {
            id: "dry-run".to_string(),
            name: name.to_string(),
            kind: ChannelKind::Voice,
            parent_id: None,
        })
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()> {
        tracing::info!("[dry-run] would rename channel {} to '{}'", channel_id, name);
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<()> {
        tracing::info!("[dry-run] would delete channel {}", channel_id);
        Ok(())
    }

    async fn list_messages(&self, channel_id: &str, limit: usize) -> Result<Vec<MessageInfo>> {
        self.inner.list_messages(channel_id, limit).await
    }

    async fn create_message(&self, channel_id: &str, embed: &Embed) -> Result<MessageInfo> {
        tracing::info!(
            "[dry-run] would send message '{}' to channel {}",
            embed.title,
            channel_id
        );
        Ok(Self::placeholder_message())
    }

    async fn edit_message(&self, channel_id: &str, message_id: &str, embed: &Embed) -> Result<()> {
        tracing::info!(
            "[dry-run] would edit message {} in channel {} ('{}')",
            message_id,
            channel_id,
            embed.title
        );
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        tracing::info!(
            "[dry-run] would delete message {} in channel {}",
            message_id,
            channel_id
        );
        Ok(())
    }
}
