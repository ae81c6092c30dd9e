//! Recently-added reconciliation pass
//!
//! Mirrors the newest library additions into a single embed panel,
//! grouped by category. The fingerprint covers the underlying items, not
//! the rendered relative ages, so the panel is only edited when the item
//! list actually changes.

use crate::bot::panel::sync_panel;
use crate::bot::render;
use crate::bot::scheduler::Pass;
use crate::bot::state::{DisplayKey, DisplayStateStore};
use crate::discord::ChatSurface;
use crate::error::Result;
use crate::sources::{MediaServer, RecentItem};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

/// The panel shows at most this many items
const DISPLAY_LIMIT: usize = 10;

/// Fetch headroom so deduplication still fills the panel
const FETCH_LIMIT: usize = 20;

/// Reconciles recently added items into the recently-added panel
pub struct RecentlyAddedPass {
    source: Arc<dyn MediaServer>,
    chat: Arc<dyn ChatSurface>,
    store: DisplayStateStore,
    color: u32,
    channel_id: String,
}

impl RecentlyAddedPass {
    /// Create the pass
    pub fn new(
        source: Arc<dyn MediaServer>,
        chat: Arc<dyn ChatSurface>,
        channel_id: String,
        color: u32,
        store: DisplayStateStore,
    ) -> Self {
        Self {
            source,
            chat,
            store,
            color,
            channel_id,
        }
    }

    /// The display state, for inspection in tests
    pub fn store(&self) -> &DisplayStateStore {
        &self.store
    }
}

/// Normalize the raw item list: newest first, unique by item id,
/// truncated to the display limit
pub fn normalize_items(mut items: Vec<RecentItem>) -> Vec<RecentItem> {
    items.sort_by(|a, b| b.added.cmp(&a.added));

    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(item.id.clone()));
    items.truncate(DISPLAY_LIMIT);
    items
}

#[async_trait]
impl Pass for RecentlyAddedPass {
    fn name(&self) -> &'static str {
        "recently-added"
    }

    async fn run(&mut self) -> Result<()> {
        let items = normalize_items(self.source.fetch_recent_items(FETCH_LIMIT).await?);

        // An empty library listing leaves the existing panel in place.
        if items.is_empty() {
            tracing::debug!("No recently added items to display");
            return Ok(());
        }

        let (embed, fingerprint) = render::render_recently_added(&items, self.color, Utc::now());

        sync_panel(
            &self.chat,
            &mut self.store,
            DisplayKey::RecentlyAddedPanel,
            &self.channel_id,
            &embed,
            fingerprint,
        )
        .await
    }
}
