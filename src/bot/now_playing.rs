//! Now-playing reconciliation pass
//!
//! Mirrors the active session list into a single embed panel. The panel
//! is edited in place while sessions change, skipped entirely while they
//! do not, and deleted once when the last session ends.

use crate::bot::panel::{clear_panel, sync_panel};
use crate::bot::render;
use crate::bot::scheduler::Pass;
use crate::bot::state::{DisplayKey, DisplayStateStore};
use crate::config::DisplayConfig;
use crate::discord::ChatSurface;
use crate::error::Result;
use crate::sources::MediaServer;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Reconciles active playback sessions into the now-playing panel
pub struct NowPlayingPass {
    source: Arc<dyn MediaServer>,
    chat: Arc<dyn ChatSurface>,
    store: DisplayStateStore,
    display: DisplayConfig,
    color: u32,
    channel_id: String,
}

impl NowPlayingPass {
    /// Create the pass
    ///
    /// # Arguments
    ///
    /// * `source` - Media server to poll
    /// * `chat` - Chat surface to render into
    /// * `channel_id` - Resolved now-playing text channel
    /// * `display` - Per-field display toggles
    /// * `color` - Embed accent color
    /// * `store` - Display state, optionally seeded with an adopted panel
    pub fn new(
        source: Arc<dyn MediaServer>,
        chat: Arc<dyn ChatSurface>,
        channel_id: String,
        display: DisplayConfig,
        color: u32,
        store: DisplayStateStore,
    ) -> Self {
        Self {
            source,
            chat,
            store,
            display,
            color,
            channel_id,
        }
    }

    /// The display state, for inspection in tests
    pub fn store(&self) -> &DisplayStateStore {
        &self.store
    }
}

#[async_trait]
impl Pass for NowPlayingPass {
    fn name(&self) -> &'static str {
        "now-playing"
    }

    async fn run(&mut self) -> Result<()> {
        let sessions = self.source.fetch_active_sessions().await?;

        if sessions.is_empty() {
            return clear_panel(&self.chat, &mut self.store, DisplayKey::NowPlayingPanel).await;
        }

        let (embed, fingerprint) =
            render::render_now_playing(&sessions, &self.display, self.color, Utc::now());

        sync_panel(
            &self.chat,
            &mut self.store,
            DisplayKey::NowPlayingPanel,
            &self.channel_id,
            &embed,
            fingerprint,
        )
        .await
    }
}
