//! Jellycord - Emby/Jellyfin activity mirrored into Discord
//!
//! This library provides the core functionality for the Jellycord bot:
//! polling a media server and reconciling its state into Discord channels
//! with the minimum number of outbound calls.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `bot`: Reconciliation passes, display state, rendering, scheduling
//! - `sources`: Media-server abstraction and Emby/Jellyfin clients
//! - `discord`: Chat-surface abstraction and the Discord REST client
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `web`: Optional health endpoint
//!
//! # Example
//!
//! ```no_run
//! use jellycord::{Bot, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("jellycord.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     Bot::new(config, false)?.run().await
//! }
//! ```

pub mod bot;
pub mod cli;
pub mod config;
pub mod discord;
pub mod error;
pub mod sources;
pub mod web;

// Re-export commonly used types
pub use bot::{Bot, DisplayKey, DisplayRecord, DisplayStateStore};
pub use config::Config;
pub use discord::{ChatSurface, DiscordClient};
pub use error::{JellycordError, Result};
pub use sources::{create_media_server, MediaServer};
