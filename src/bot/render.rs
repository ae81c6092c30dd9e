//! Rendering for Jellycord
//!
//! Turns normalized media-server state into Discord embeds and channel
//! names, and computes the content fingerprints the reconciliation passes
//! diff against. Fingerprints never cover relative timestamps: the
//! recently-added panel hashes the underlying item data so "3h ago"
//! drifting to "4h ago" does not force an edit on every tick.

use crate::config::DisplayConfig;
use crate::discord::Embed;
use crate::sources::{Category, CollectionType, LibraryCount, PlayState, RecentItem, Session};

use chrono::{DateTime, Utc};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Discord caps channel names at 100 characters
const CHANNEL_NAME_LIMIT: usize = 100;

/// SHA-256 over a canonical JSON value, hex encoded
pub fn fingerprint(value: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Format seconds as `H:MM:SS`
pub fn format_clock(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Format a count with K/M suffixes for channel names
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Relative age of a timestamp ("3d ago", "5h ago", "12m ago")
pub fn relative_age(added: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(added);
    if delta.num_days() > 0 {
        format!("{}d ago", delta.num_days())
    } else if delta.num_hours() > 0 {
        format!("{}h ago", delta.num_hours())
    } else {
        format!("{}m ago", delta.num_minutes().max(0))
    }
}

fn media_type_emoji(session: &Session) -> &'static str {
    match session.media_type {
        crate::sources::MediaType::Movie => "🎬",
        crate::sources::MediaType::Episode => "📺",
        _ => "🎵",
    }
}

fn state_emoji(state: PlayState) -> &'static str {
    match state {
        PlayState::Playing => "▶️",
        PlayState::Paused => "⏸️",
        PlayState::Stopped => "⏹️",
    }
}

fn category_emoji(category: Category) -> &'static str {
    match category {
        Category::Movies => "🎬",
        Category::TvShows => "📺",
        Category::Music => "🎵",
        Category::Other => "📁",
    }
}

/// Field name for one stream in the now-playing panel
fn session_field_name(session: &Session, display: &DisplayConfig) -> String {
    let emoji = if display.show_media_type {
        format!("{} ", media_type_emoji(session))
    } else {
        String::new()
    };
    if display.show_media_title {
        format!("{}{}", emoji, session.title)
    } else {
        format!("{}Stream", emoji)
    }
}

/// Field value for one stream, honoring the per-field display toggles
fn session_field_value(session: &Session, display: &DisplayConfig) -> String {
    let mut lines = Vec::new();

    if display.show_user {
        lines.push(format!("👤 **User:** {}", session.user));
    }
    if display.show_player_info {
        lines.push(format!(
            "🎮 **Player:** {} ({})",
            session.product, session.player
        ));
    }
    if display.show_quality_profile {
        lines.push(format!("🎯 **Quality:** {}", session.quality));
    }
    if display.show_progress && session.runtime_secs > 0 {
        let mut progress = format!(
            "⏱️ **Progress:** {}/{}",
            format_clock(session.position_secs),
            format_clock(session.runtime_secs)
        );
        if display.show_eta && session.runtime_secs > session.position_secs {
            let remaining = session.runtime_secs - session.position_secs;
            progress.push_str(&format!(" (⌛ {} remaining)", format_clock(remaining)));
        }
        lines.push(progress);
    }
    if display.show_stream_state {
        lines.push(format!(
            "{} **State:** {}",
            state_emoji(session.state),
            session.state.label()
        ));
    }
    if display.show_bandwidth_per_stream && session.bandwidth_bps > 0 {
        lines.push(format!(
            "📊 **Bandwidth:** {:.1} Mbps",
            session.bandwidth_bps as f64 / 1_000_000.0
        ));
    }
    if display.show_transcoding_status && session.transcoding {
        lines.push("⚡ **Transcoding:** Yes".to_string());
    }

    lines.join("\n")
}

/// Render the now-playing panel
///
/// # Returns
///
/// The embed and its content fingerprint. The fingerprint covers the
/// title, summary, and stream fields but not the footer timestamp, so an
/// unchanged session set produces an identical fingerprint.
pub fn render_now_playing(
    sessions: &[Session],
    display: &DisplayConfig,
    color: u32,
    now: DateTime<Utc>,
) -> (Embed, String) {
    let transcode_count = sessions.iter().filter(|s| s.transcoding).count();
    let total_bandwidth: u64 = sessions.iter().map(|s| s.bandwidth_bps).sum();

    let mut summary = vec![format!("📊 **Active Streams:** {}", sessions.len())];
    if display.show_transcoding_count {
        summary.push(format!("⚡ **Transcoding:** {}", transcode_count));
    }
    if display.show_bandwidth && total_bandwidth > 0 {
        summary.push(format!(
            "📶 **Bandwidth:** {:.1} Mbps",
            total_bandwidth as f64 / 1_000_000.0
        ));
    }

    let mut embed = Embed::new("🎬 Now Playing", color)
        .description(summary.join("\n"))
        .footer("Last updated")
        .timestamp(now.to_rfc3339());

    for session in sessions {
        embed = embed.field(
            session_field_name(session, display),
            session_field_value(session, display),
        );
    }

    let digest = fingerprint(&json!({
        "title": embed.title,
        "description": embed.description,
        "fields": embed.fields,
    }));

    (embed, digest)
}

/// Render the recently-added panel from an already normalized item list
/// (deduplicated, newest first, truncated)
///
/// # Returns
///
/// The embed and a fingerprint over the underlying item data. Relative
/// ages are recomputed at render time and excluded from the fingerprint.
pub fn render_recently_added(
    items: &[RecentItem],
    color: u32,
    now: DateTime<Utc>,
) -> (Embed, String) {
    let mut embed = Embed::new("📥 Recently Added Media", color)
        .footer("Last updated")
        .timestamp(now.to_rfc3339());

    for category in [
        Category::Movies,
        Category::TvShows,
        Category::Music,
        Category::Other,
    ] {
        let group: Vec<&RecentItem> = items
            .iter()
            .filter(|item| item.category() == category)
            .collect();
        if group.is_empty() {
            continue;
        }

        let value = group
            .iter()
            .map(|item| format!("• {} ({})", item.title, relative_age(item.added, now)))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field(
            format!("{} {}", category_emoji(category), category.label()),
            value,
        );
    }

    let digest = fingerprint(&json!(items
        .iter()
        .map(|item| {
            json!({
                "id": item.id,
                "title": item.title,
                "category": item.category().label(),
                "added": item.added.to_rfc3339(),
            })
        })
        .collect::<Vec<_>>()));

    (embed, digest)
}

/// Channel name for one library count, e.g. `🎬 Movies: 1.2K`
///
/// The emoji and label follow the library's collection type and the
/// 4K/Kids/Anime naming flags; the result is truncated to Discord's
/// channel name limit.
pub fn library_channel_name(library: &LibraryCount) -> String {
    let (emoji, label) = match library.collection_type {
        CollectionType::Movies => {
            if library.is_4k {
                ("🎬", "4K Movies")
            } else {
                ("🎬", "Movies")
            }
        }
        CollectionType::TvShows => {
            if library.is_kids {
                ("🏠", "Kids TV")
            } else if library.is_anime {
                ("👾", "Anime")
            } else if library.is_4k {
                ("📺", "4K TV Shows")
            } else {
                ("📺", "TV Shows")
            }
        }
        CollectionType::Music => ("🎵", "Music"),
    };

    let name = format!("{} {}: {}", emoji, label, format_count(library.count));
    name.chars().take(CHANNEL_NAME_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MediaType;
    use chrono::TimeZone;

    fn session(title: &str) -> Session {
        Session {
            session_id: "s1".to_string(),
            user: "alice".to_string(),
            media_type: MediaType::Movie,
            title: title.to_string(),
            product: "Emby Web".to_string(),
            player: "Firefox".to_string(),
            quality: "1920x1080 8.0Mbps (direct)".to_string(),
            position_secs: 600,
            runtime_secs: 3600,
            state: PlayState::Playing,
            transcoding: false,
            bandwidth_bps: 0,
        }
    }

    fn recent(id: &str, title: &str, media_type: MediaType, added: DateTime<Utc>) -> RecentItem {
        RecentItem {
            id: id.to_string(),
            title: title.to_string(),
            media_type,
            added,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00:00");
        assert_eq!(format_clock(75), "0:01:15");
        assert_eq!(format_clock(3725), "1:02:05");
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_200), "1.2K");
        assert_eq!(format_count(2_500_000), "2.5M");
    }

    #[test]
    fn test_relative_age() {
        let now = now();
        assert_eq!(relative_age(now - chrono::Duration::days(3), now), "3d ago");
        assert_eq!(
            relative_age(now - chrono::Duration::hours(5), now),
            "5h ago"
        );
        assert_eq!(
            relative_age(now - chrono::Duration::minutes(12), now),
            "12m ago"
        );
        assert_eq!(relative_age(now, now), "0m ago");
    }

    #[test]
    fn test_now_playing_fingerprint_stable_across_time() {
        let sessions = vec![session("Heat")];
        let display = DisplayConfig::default();

        let (_, fp1) = render_now_playing(&sessions, &display, 1, now());
        let (_, fp2) = render_now_playing(
            &sessions,
            &display,
            1,
            now() + chrono::Duration::seconds(30),
        );
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn test_now_playing_fingerprint_changes_with_progress() {
        let display = DisplayConfig::default();
        let mut advanced = session("Heat");
        advanced.position_secs += 5;

        let (_, fp1) = render_now_playing(&[session("Heat")], &display, 1, now());
        let (_, fp2) = render_now_playing(&[advanced], &display, 1, now());
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn test_now_playing_respects_toggles() {
        let mut display = DisplayConfig::default();
        display.show_user = false;
        display.show_transcoding_count = true;

        let (embed, _) = render_now_playing(&[session("Heat")], &display, 1, now());
        assert!(embed.description.as_deref().unwrap().contains("Transcoding"));
        assert!(!embed.fields[0].value.contains("User"));
        assert!(embed.fields[0].value.contains("Quality"));
    }

    #[test]
    fn test_now_playing_hidden_fields_leave_fingerprint_alone() {
        let mut display = DisplayConfig::default();
        display.show_progress = false;
        display.show_eta = false;

        let mut advanced = session("Heat");
        advanced.position_secs += 60;

        let (_, fp1) = render_now_playing(&[session("Heat")], &display, 1, now());
        let (_, fp2) = render_now_playing(&[advanced], &display, 1, now());
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn test_recently_added_groups_in_order() {
        let now = now();
        let items = vec![
            recent("1", "Heat", MediaType::Movie, now - chrono::Duration::hours(1)),
            recent(
                "2",
                "Breaking Bad - S05E14 - Ozymandias",
                MediaType::Episode,
                now - chrono::Duration::hours(2),
            ),
            recent("3", "Dune", MediaType::Movie, now - chrono::Duration::hours(3)),
        ];

        let (embed, _) = render_recently_added(&items, 1, now);
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].name, "🎬 Movies");
        assert!(embed.fields[0].value.contains("Heat (1h ago)"));
        assert!(embed.fields[0].value.contains("Dune (3h ago)"));
        assert_eq!(embed.fields[1].name, "📺 TV Shows");
    }

    #[test]
    fn test_recently_added_fingerprint_ignores_age_drift() {
        let now = now();
        let items = vec![recent(
            "1",
            "Heat",
            MediaType::Movie,
            now - chrono::Duration::hours(1),
        )];

        let (_, fp1) = render_recently_added(&items, 1, now);
        let (_, fp2) = render_recently_added(&items, 1, now + chrono::Duration::hours(2));
        assert_eq!(fp1, fp2);
    }

    #[test]
    fn test_recently_added_fingerprint_changes_with_items() {
        let now = now();
        let one = vec![recent(
            "1",
            "Heat",
            MediaType::Movie,
            now - chrono::Duration::hours(1),
        )];
        let mut two = one.clone();
        two.push(recent(
            "2",
            "Dune",
            MediaType::Movie,
            now - chrono::Duration::hours(2),
        ));

        let (_, fp1) = render_recently_added(&one, 1, now);
        let (_, fp2) = render_recently_added(&two, 1, now);
        assert_ne!(fp1, fp2);
    }

    #[test]
    fn test_library_channel_name() {
        let library = LibraryCount {
            name: "Movies".to_string(),
            collection_type: CollectionType::Movies,
            count: 1_200,
            is_4k: false,
            is_kids: false,
            is_anime: false,
        };
        assert_eq!(library_channel_name(&library), "🎬 Movies: 1.2K");

        let library = LibraryCount {
            name: "4K Movies".to_string(),
            collection_type: CollectionType::Movies,
            count: 80,
            is_4k: true,
            is_kids: false,
            is_anime: false,
        };
        assert_eq!(library_channel_name(&library), "🎬 4K Movies: 80");

        let library = LibraryCount {
            name: "Anime".to_string(),
            collection_type: CollectionType::TvShows,
            count: 45,
            is_4k: false,
            is_kids: false,
            is_anime: true,
        };
        assert_eq!(library_channel_name(&library), "👾 Anime: 45");
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let value = json!({"a": 1, "b": [1, 2, 3]});
        assert_eq!(fingerprint(&value), fingerprint(&value));
        assert_ne!(fingerprint(&value), fingerprint(&json!({"a": 2})));
    }
}
