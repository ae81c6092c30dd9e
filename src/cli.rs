//! Command-line interface definition for Jellycord
//!
//! This module defines the CLI structure using clap's derive API.
//! The bot has a single run mode; the flags override config-file values.

use clap::Parser;

/// Jellycord - mirror Emby/Jellyfin activity into Discord
///
/// Polls the configured media server and keeps a now-playing panel,
/// a recently-added panel, and library-count channels up to date.
#[derive(Parser, Debug, Clone)]
#[command(name = "jellycord")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "jellycord.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the media server type from config (emby, jellyfin)
    #[arg(short, long)]
    pub media_server: Option<String>,

    /// Poll and render, but perform no Discord writes
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("jellycord.yaml".to_string()),
            verbose: false,
            media_server: None,
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::default();
        assert_eq!(cli.config.as_deref(), Some("jellycord.yaml"));
        assert!(!cli.verbose);
        assert!(!cli.dry_run);
        assert!(cli.media_server.is_none());
    }

    #[test]
    fn test_cli_parse_overrides() {
        let cli = Cli::parse_from([
            "jellycord",
            "--config",
            "/etc/jellycord.yaml",
            "--media-server",
            "jellyfin",
            "--dry-run",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/etc/jellycord.yaml"));
        assert_eq!(cli.media_server.as_deref(), Some("jellyfin"));
        assert!(cli.dry_run);
    }
}
