//! Library-stats reconciliation pass
//!
//! Each tracked library maps to one voice channel under the configured
//! category whose name encodes an emoji, a label, and the item count.
//! Renaming a Discord channel is rate-limited far more aggressively than
//! editing a message, so this pass runs on its own coarse interval and
//! renames only when the count actually changed. Channels left over in
//! the category from removed libraries are deleted.

use crate::bot::panel::is_stale;
use crate::bot::render;
use crate::bot::scheduler::Pass;
use crate::bot::state::{DisplayKey, DisplayRecord, DisplayStateStore};
use crate::discord::{ChannelInfo, ChannelKind, ChatSurface};
use crate::error::{JellycordError, Result};
use crate::sources::{LibraryCount, MediaServer};

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Reconciles per-library item counts into stat voice channels
pub struct LibraryStatsPass {
    source: Arc<dyn MediaServer>,
    chat: Arc<dyn ChatSurface>,
    store: DisplayStateStore,
    guild_id: String,
    category_id: String,
}

impl LibraryStatsPass {
    /// Create the pass
    ///
    /// # Arguments
    ///
    /// * `source` - Media server to poll
    /// * `chat` - Chat surface to render into
    /// * `guild_id` - Guild the stat channels live in
    /// * `category_id` - Category the stat channels are grouped under
    /// * `store` - Display state; empty on startup, channels are adopted
    ///   from the category on the first pass
    pub fn new(
        source: Arc<dyn MediaServer>,
        chat: Arc<dyn ChatSurface>,
        guild_id: String,
        category_id: String,
        store: DisplayStateStore,
    ) -> Self {
        Self {
            source,
            chat,
            store,
            guild_id,
            category_id,
        }
    }

    /// The display state, for inspection in tests
    pub fn store(&self) -> &DisplayStateStore {
        &self.store
    }

    /// Voice channels currently under the stats category
    async fn category_channels(&self) -> Result<Vec<ChannelInfo>> {
        let channels = self.chat.list_guild_channels(&self.guild_id).await?;
        Ok(channels
            .into_iter()
            .filter(|c| {
                c.kind == ChannelKind::Voice
                    && c.parent_id.as_deref() == Some(self.category_id.as_str())
            })
            .collect())
    }

    /// Reconcile one library; returns the id of the channel now serving it
    async fn sync_library(
        &mut self,
        library: &LibraryCount,
        existing: &[ChannelInfo],
    ) -> Result<String> {
        let name = render::library_channel_name(library);
        let key = DisplayKey::LibraryChannel(library.name.clone());

        let Some(record) = self.store.get(&key).cloned() else {
            // First pass for this library: adopt a channel carrying the
            // same label prefix (count may be out of date), else create.
            let prefix = match name.rsplit_once(':') {
                Some((head, _)) => format!("{}:", head),
                None => name.clone(),
            };

            if let Some(channel) = existing.iter().find(|c| c.name.starts_with(&prefix)) {
                if channel.name != name {
                    self.chat.rename_channel(&channel.id, &name).await?;
                    tracing::info!("Adopted and renamed stat channel to '{}'", name);
                }
                self.store
                    .set(key, DisplayRecord::channel(channel.id.clone(), name));
                return Ok(channel.id.clone());
            }

            let created = self
                .chat
                .create_voice_channel(&self.guild_id, &name, Some(&self.category_id))
                .await?;
            let id = created.id.clone();
            self.store.set(key, DisplayRecord::channel(created.id, name));
            return Ok(id);
        };

        // The rendered name is the fingerprint: identical name means the
        // count is unchanged and no rename happens this tick.
        if record.fingerprint == name {
            return Ok(record.channel_id);
        }

        match self.chat.rename_channel(&record.channel_id, &name).await {
            Ok(()) => {
                tracing::info!("Renamed stat channel to '{}'", name);
                let id = record.channel_id.clone();
                self.store
                    .set(key, DisplayRecord::channel(record.channel_id, name));
                Ok(id)
            }
            Err(e) if is_stale(&e) => {
                tracing::warn!("Stat channel {} disappeared, recreating", record.channel_id);
                let created = self
                    .chat
                    .create_voice_channel(&self.guild_id, &name, Some(&self.category_id))
                    .await?;
                let id = created.id.clone();
                self.store.set(key, DisplayRecord::channel(created.id, name));
                Ok(id)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Pass for LibraryStatsPass {
    fn name(&self) -> &'static str {
        "library-stats"
    }

    async fn run(&mut self) -> Result<()> {
        let counts = self.source.fetch_library_counts().await?;
        if counts.is_empty() {
            tracing::debug!("No library counts to display");
            return Ok(());
        }

        let existing = self.category_channels().await?;

        let mut served: HashSet<String> = HashSet::new();
        for library in &counts {
            match self.sync_library(library, &existing).await {
                Ok(channel_id) => {
                    served.insert(channel_id);
                }
                Err(e) => {
                    if e.downcast_ref::<JellycordError>()
                        .is_some_and(JellycordError::is_fatal_for_feature)
                    {
                        return Err(e);
                    }
                    tracing::warn!("Failed to update stats for '{}': {}", library.name, e);
                }
            }
        }

        // Drop category channels no longer backed by a library.
        for channel in &existing {
            if served.contains(&channel.id) {
                continue;
            }
            match self.chat.delete_channel(&channel.id).await {
                Ok(()) => tracing::info!("Deleted stale stat channel '{}'", channel.name),
                Err(e) if is_stale(&e) => {}
                Err(e) => {
                    if e.downcast_ref::<JellycordError>()
                        .is_some_and(JellycordError::is_fatal_for_feature)
                    {
                        return Err(e);
                    }
                    tracing::warn!("Failed to delete stat channel '{}': {}", channel.name, e);
                }
            }
        }

        Ok(())
    }
}
