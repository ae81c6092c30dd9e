//! Display state store for Jellycord
//!
//! In-memory record of what was last rendered to Discord. Nothing here is
//! persisted: after a restart the bot re-adopts or recreates its resources
//! from what Discord itself retains.

use std::collections::HashMap;

/// Identity of one logical display unit
///
/// Each reconciliation pass owns a disjoint set of keys, so the passes
/// never contend for the same record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayKey {
    /// The single now-playing embed panel
    NowPlayingPanel,
    /// The single recently-added embed panel
    RecentlyAddedPanel,
    /// One library-count voice channel, keyed by library name
    LibraryChannel(String),
}

/// Binding between a display unit and its Discord resource
///
/// `fingerprint` summarizes the last rendered content; a pass whose fresh
/// render matches it skips the outbound call entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRecord {
    /// Channel the resource lives in (or is, for channel resources)
    pub channel_id: String,
    /// Message id for panel resources; `None` for channel resources
    pub message_id: Option<String>,
    /// Fingerprint of the last rendered content
    pub fingerprint: String,
}

impl DisplayRecord {
    /// Record for an embed panel message
    pub fn panel(channel_id: impl Into<String>, message_id: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: Some(message_id.into()),
            fingerprint: fingerprint.into(),
        }
    }

    /// Record for a stat channel whose name is the rendered content
    pub fn channel(channel_id: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: None,
            fingerprint: fingerprint.into(),
        }
    }
}

/// In-memory map from display unit to display record
///
/// Constructed explicitly and handed to each pass, so tests can seed it
/// with controlled contents. Each pass receives its own store; no locking
/// is needed because a pass is the sole mutator of its partition.
#[derive(Debug, Default)]
pub struct DisplayStateStore {
    records: HashMap<DisplayKey, DisplayRecord>,
}

impl DisplayStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the record for a display unit
    pub fn get(&self, key: &DisplayKey) -> Option<&DisplayRecord> {
        self.records.get(key)
    }

    /// Bind (or rebind) a display unit to a record
    pub fn set(&mut self, key: DisplayKey, record: DisplayRecord) {
        self.records.insert(key, record);
    }

    /// Drop the record for a display unit
    pub fn remove(&mut self, key: &DisplayKey) -> Option<DisplayRecord> {
        self.records.remove(key)
    }

    /// Iterate all records
    pub fn iter(&self) -> impl Iterator<Item = (&DisplayKey, &DisplayRecord)> {
        self.records.iter()
    }

    /// Number of bound display units
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no display unit is bound
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
