//! Bot startup and lifecycle for Jellycord
//!
//! Performs the startup checks that must abort before the loops begin
//! (Discord auth, media-server connectivity, guild and channel
//! resolution), adopts any panels the bot left behind in a previous run,
//! then spawns one scheduler loop per enabled feature.

use crate::bot::library_stats::LibraryStatsPass;
use crate::bot::now_playing::NowPlayingPass;
use crate::bot::recently_added::RecentlyAddedPass;
use crate::bot::scheduler;
use crate::bot::state::{DisplayKey, DisplayRecord, DisplayStateStore};
use crate::config::Config;
use crate::discord::{
    normalize_channel_name, ChannelInfo, ChannelKind, ChatSurface, DiscordClient, DryRunChat,
};
use crate::error::Result;
use crate::sources::{create_media_server, MediaServer};
use crate::web;

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How many messages to scan when re-adopting a panel after a restart
const ADOPTION_SCAN_LIMIT: usize = 10;

/// The Jellycord bot: media source, chat surface, and feature loops
pub struct Bot {
    config: Config,
    source: Arc<dyn MediaServer>,
    chat: Arc<dyn ChatSurface>,
}

impl Bot {
    /// Build the bot from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `dry_run` - Log Discord writes instead of performing them
    ///
    /// # Errors
    ///
    /// Returns error if a client cannot be constructed
    pub fn new(config: Config, dry_run: bool) -> Result<Self> {
        let source = create_media_server(&config.media_server)?;

        let chat: Arc<dyn ChatSurface> = Arc::new(DiscordClient::new(&config.discord)?);
        let chat: Arc<dyn ChatSurface> = if dry_run {
            tracing::warn!("Dry run: Discord writes will only be logged");
            Arc::new(DryRunChat::new(chat))
        } else {
            chat
        };

        Ok(Self {
            config,
            source,
            chat,
        })
    }

    /// Run the bot until ctrl-c
    ///
    /// # Errors
    ///
    /// Startup failures (auth, unreachable media server, unresolvable
    /// guild or channels) abort before any loop starts. Once the loops
    /// are running, per-tick failures never propagate here.
    pub async fn run(self) -> Result<()> {
        let user = self.chat.current_user().await?;
        tracing::info!("Logged in as {} (ID: {})", user.name, user.id);

        let info = self.source.prepare().await?;
        tracing::info!(
            "Connected to {} server '{}' (version {})",
            self.source.kind(),
            info.name,
            info.version
        );

        let guild_id = self.config.discord.server_id.clone();
        let channels = self.chat.list_guild_channels(&guild_id).await?;
        tracing::info!("Guild {} has {} channels", guild_id, channels.len());

        let color = self.config.discord.embed_color_value()?;
        let refresh = self.config.general.refresh_interval();
        let library_refresh = self.config.general.library_refresh_interval();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks: Vec<JoinHandle<()>> = Vec::new();

        if self.config.display.show_current_streams {
            let channel = self
                .ensure_text_channel(
                    &channels,
                    "🎬",
                    &self.config.discord.now_playing_channel,
                    None,
                )
                .await?;
            let store = self.adopt_panel(&channel.id, DisplayKey::NowPlayingPanel, &user.id).await;

            let pass = NowPlayingPass::new(
                self.source.clone(),
                self.chat.clone(),
                channel.id,
                self.config.display.clone(),
                color,
                store,
            );
            tasks.push(tokio::spawn(scheduler::drive(
                pass,
                refresh,
                shutdown_rx.clone(),
            )));
        }

        if self.config.display.show_recently_added {
            let parent = if self.config.discord.library_stats_category_id.is_empty() {
                None
            } else {
                Some(self.config.discord.library_stats_category_id.as_str())
            };
            let channel = self
                .ensure_text_channel(
                    &channels,
                    "📥",
                    &self.config.discord.recently_added_channel,
                    parent,
                )
                .await?;
            let store = self
                .adopt_panel(&channel.id, DisplayKey::RecentlyAddedPanel, &user.id)
                .await;

            let pass = RecentlyAddedPass::new(
                self.source.clone(),
                self.chat.clone(),
                channel.id,
                color,
                store,
            );
            tasks.push(tokio::spawn(scheduler::drive(
                pass,
                refresh,
                shutdown_rx.clone(),
            )));
        }

        if self.config.display.show_library_counts {
            let pass = LibraryStatsPass::new(
                self.source.clone(),
                self.chat.clone(),
                guild_id,
                self.config.discord.library_stats_category_id.clone(),
                DisplayStateStore::new(),
            );
            tasks.push(tokio::spawn(scheduler::drive(
                pass,
                library_refresh,
                shutdown_rx.clone(),
            )));
        }

        if tasks.is_empty() {
            tracing::warn!("All display features are disabled; nothing to reconcile");
        }

        if self.config.web.enable {
            let bind = self.config.web.bind.clone();
            let rx = shutdown_rx.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) = web::serve(&bind, rx).await {
                    tracing::error!("Health endpoint failed: {}", e);
                }
            }));
        }

        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutting down");
        let _ = shutdown_tx.send(true);
        for task in tasks {
            let _ = task.await;
        }

        Ok(())
    }

    /// Find or create a text channel by name
    ///
    /// Matches both the emoji-prefixed and plain form of the configured
    /// name, after Discord-style normalization.
    async fn ensure_text_channel(
        &self,
        channels: &[ChannelInfo],
        emoji: &str,
        base_name: &str,
        parent_id: Option<&str>,
    ) -> Result<ChannelInfo> {
        let full_name = format!("{}-{}", emoji, base_name);
        let wanted = [
            normalize_channel_name(&full_name),
            normalize_channel_name(base_name),
        ];

        if let Some(channel) = channels.iter().find(|c| {
            c.kind == ChannelKind::Text && wanted.contains(&normalize_channel_name(&c.name))
        }) {
            tracing::info!("Using existing channel '{}' ({})", channel.name, channel.id);
            return Ok(channel.clone());
        }

        tracing::info!("Creating channel '{}'", full_name);
        self.chat
            .create_text_channel(&self.config.discord.server_id, &full_name, parent_id)
            .await
    }

    /// Seed a display store with the bot's most recent panel message
    ///
    /// After a restart the previous panel still exists in the channel;
    /// adopting it (with an unknown fingerprint, so the first pass edits
    /// it) avoids stacking a new panel under the old one. Failures fall
    /// back to an empty store and a fresh panel.
    async fn adopt_panel(
        &self,
        channel_id: &str,
        key: DisplayKey,
        bot_user_id: &str,
    ) -> DisplayStateStore {
        let mut store = DisplayStateStore::new();

        match self.chat.list_messages(channel_id, ADOPTION_SCAN_LIMIT).await {
            Ok(messages) => {
                if let Some(message) = messages.iter().find(|m| m.author_id == bot_user_id) {
                    tracing::info!("Adopted existing panel message {}", message.id);
                    store.set(
                        key,
                        DisplayRecord::panel(channel_id, message.id.clone(), String::new()),
                    );
                }
            }
            Err(e) => {
                tracing::warn!("Could not scan channel {} for old panels: {}", channel_id, e);
            }
        }

        store
    }
}
