//! Shared test fakes: an in-memory media server and a recording chat
//! surface, so the reconciliation passes can be driven through many ticks
//! without a network or a wall clock.

use async_trait::async_trait;
use jellycord::discord::{ChannelInfo, ChannelKind, ChatSurface, ChatUser, Embed, MessageInfo};
use jellycord::error::{JellycordError, Result};
use jellycord::sources::{LibraryCount, MediaServer, RecentItem, ServerInfo, Session};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scripted media server: tests set the state each fetch returns and can
/// fail individual operations to simulate an unreachable server.
#[derive(Default)]
pub struct FakeMediaServer {
    pub sessions: Mutex<Vec<Session>>,
    pub recent: Mutex<Vec<RecentItem>>,
    pub counts: Mutex<Vec<LibraryCount>>,
    pub fail_sessions: AtomicBool,
    pub fail_recent: AtomicBool,
    pub fail_counts: AtomicBool,
}

#[allow(dead_code)]
impl FakeMediaServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        *self.sessions.lock().unwrap() = sessions;
    }

    pub fn set_recent(&self, items: Vec<RecentItem>) {
        *self.recent.lock().unwrap() = items;
    }

    pub fn set_counts(&self, counts: Vec<LibraryCount>) {
        *self.counts.lock().unwrap() = counts;
    }
}

#[async_trait]
impl MediaServer for FakeMediaServer {
    fn kind(&self) -> &'static str {
        "fake"
    }

    async fn prepare(&self) -> Result<ServerInfo> {
        Ok(ServerInfo {
            name: "fake".to_string(),
            version: "1.0".to_string(),
        })
    }

    async fn fetch_active_sessions(&self) -> Result<Vec<Session>> {
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(JellycordError::SourceUnavailable("sessions down".to_string()).into());
        }
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn fetch_recent_items(&self, _limit: usize) -> Result<Vec<RecentItem>> {
        if self.fail_recent.load(Ordering::SeqCst) {
            return Err(JellycordError::SourceUnavailable("recent down".to_string()).into());
        }
        Ok(self.recent.lock().unwrap().clone())
    }

    async fn fetch_library_counts(&self) -> Result<Vec<LibraryCount>> {
        if self.fail_counts.load(Ordering::SeqCst) {
            return Err(JellycordError::SourceUnavailable("counts down".to_string()).into());
        }
        Ok(self.counts.lock().unwrap().clone())
    }
}

/// One outbound chat operation, recorded in order
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ChatCall {
    CreateMessage { channel_id: String, embed: Embed },
    EditMessage { message_id: String, embed: Embed },
    DeleteMessage { message_id: String },
    CreateTextChannel { name: String },
    CreateVoiceChannel { name: String },
    RenameChannel { channel_id: String, name: String },
    DeleteChannel { channel_id: String },
}

/// Recording chat surface
///
/// Write operations append to `calls`; messages and channels marked
/// missing answer with `StaleResource`, and `fail_writes_with` forces
/// every write to fail with the given status for error-path tests.
#[derive(Default)]
pub struct FakeChat {
    pub calls: Mutex<Vec<ChatCall>>,
    pub channels: Mutex<Vec<ChannelInfo>>,
    pub messages: Mutex<Vec<MessageInfo>>,
    pub missing_messages: Mutex<HashSet<String>>,
    pub missing_channels: Mutex<HashSet<String>>,
    pub fail_writes_with: Mutex<Option<(u16, bool)>>,
    next_id: AtomicUsize,
}

#[allow(dead_code)]
impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_channel(&self, id: &str, name: &str, kind: ChannelKind, parent_id: Option<&str>) {
        self.channels.lock().unwrap().push(ChannelInfo {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            parent_id: parent_id.map(str::to_string),
        });
    }

    pub fn mark_message_missing(&self, message_id: &str) {
        self.missing_messages
            .lock()
            .unwrap()
            .insert(message_id.to_string());
    }

    pub fn mark_channel_missing(&self, channel_id: &str) {
        self.missing_channels
            .lock()
            .unwrap()
            .insert(channel_id.to_string());
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn create_message_count(&self) -> usize {
        self.count(|c| matches!(c, ChatCall::CreateMessage { .. }))
    }

    pub fn edit_count(&self) -> usize {
        self.count(|c| matches!(c, ChatCall::EditMessage { .. }))
    }

    pub fn delete_message_count(&self) -> usize {
        self.count(|c| matches!(c, ChatCall::DeleteMessage { .. }))
    }

    pub fn rename_count(&self) -> usize {
        self.count(|c| matches!(c, ChatCall::RenameChannel { .. }))
    }

    pub fn create_voice_count(&self) -> usize {
        self.count(|c| matches!(c, ChatCall::CreateVoiceChannel { .. }))
    }

    pub fn delete_channel_count(&self) -> usize {
        self.count(|c| matches!(c, ChatCall::DeleteChannel { .. }))
    }

    /// Embed from the most recent create or edit, if any
    pub fn last_embed(&self) -> Option<Embed> {
        self.calls().iter().rev().find_map(|call| match call {
            ChatCall::CreateMessage { embed, .. } | ChatCall::EditMessage { embed, .. } => {
                Some(embed.clone())
            }
            _ => None,
        })
    }

    fn count(&self, predicate: impl Fn(&ChatCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn check_write(&self) -> Result<()> {
        if let Some((status, retryable)) = *self.fail_writes_with.lock().unwrap() {
            return Err(JellycordError::ChatApi {
                status,
                retryable,
                message: "scripted failure".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn stale(&self, what: &str) -> anyhow::Error {
        JellycordError::StaleResource(what.to_string()).into()
    }
}

#[async_trait]
impl ChatSurface for FakeChat {
    async fn current_user(&self) -> Result<ChatUser> {
        Ok(ChatUser {
            id: "bot".to_string(),
            name: "jellycord".to_string(),
        })
    }

    async fn list_guild_channels(&self, _guild_id: &str) -> Result<Vec<ChannelInfo>> {
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn create_text_channel(
        &self,
        _guild_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        self.check_write()?;
        let info = ChannelInfo {
            id: self.next_id("c"),
            name: name.to_string(),
            kind: ChannelKind::Text,
            parent_id: parent_id.map(str::to_string),
        };
        self.channels.lock().unwrap().push(info.clone());
        self.calls
            .lock()
            .unwrap()
            .push(ChatCall::CreateTextChannel {
                name: name.to_string(),
            });
        Ok(info)
    }

    async fn create_voice_channel(
        &self,
        _guild_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        self.check_write()?;
        let info = ChannelInfo {
            id: self.next_id("c"),
            name: name.to_string(),
            kind: ChannelKind::Voice,
            parent_id: parent_id.map(str::to_string),
        };
        self.channels.lock().unwrap().push(info.clone());
        self.calls
            .lock()
            .unwrap()
            .push(ChatCall::CreateVoiceChannel {
                name: name.to_string(),
            });
        Ok(info)
    }

    async fn rename_channel(&self, channel_id: &str, name: &str) -> Result<()> {
        self.check_write()?;
        if self.missing_channels.lock().unwrap().contains(channel_id) {
            return Err(self.stale(channel_id));
        }
        if let Some(channel) = self
            .channels
            .lock()
            .unwrap()
            .iter_mut()
            .find(|c| c.id == channel_id)
        {
            channel.name = name.to_string();
        }
        self.calls.lock().unwrap().push(ChatCall::RenameChannel {
            channel_id: channel_id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<()> {
        self.check_write()?;
        if self.missing_channels.lock().unwrap().contains(channel_id) {
            return Err(self.stale(channel_id));
        }
        self.channels.lock().unwrap().retain(|c| c.id != channel_id);
        self.calls.lock().unwrap().push(ChatCall::DeleteChannel {
            channel_id: channel_id.to_string(),
        });
        Ok(())
    }

    async fn list_messages(&self, _channel_id: &str, _limit: usize) -> Result<Vec<MessageInfo>> {
        Ok(self.messages.lock().unwrap().clone())
    }

    async fn create_message(&self, channel_id: &str, embed: &Embed) -> Result<MessageInfo> {
        self.check_write()?;
        let info = MessageInfo {
            id: self.next_id("m"),
            author_id: "bot".to_string(),
        };
        self.calls.lock().unwrap().push(ChatCall::CreateMessage {
            channel_id: channel_id.to_string(),
            embed: embed.clone(),
        });
        Ok(info)
    }

    async fn edit_message(&self, _channel_id: &str, message_id: &str, embed: &Embed) -> Result<()> {
        self.check_write()?;
        if self.missing_messages.lock().unwrap().contains(message_id) {
            return Err(self.stale(message_id));
        }
        self.calls.lock().unwrap().push(ChatCall::EditMessage {
            message_id: message_id.to_string(),
            embed: embed.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, _channel_id: &str, message_id: &str) -> Result<()> {
        self.check_write()?;
        if self.missing_messages.lock().unwrap().contains(message_id) {
            return Err(self.stale(message_id));
        }
        self.calls.lock().unwrap().push(ChatCall::DeleteMessage {
            message_id: message_id.to_string(),
        });
        Ok(())
    }
}
