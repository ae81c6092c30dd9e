//! Shared create/edit/no-op state machine for embed panels
//!
//! The now-playing and recently-added passes both maintain a single embed
//! message; this module holds the transition logic they share. Editing in
//! place preserves message identity and avoids notification spam; the
//! no-op branch is what keeps the bot inside Discord's rate limits.

use crate::bot::state::{DisplayKey, DisplayRecord, DisplayStateStore};
use crate::discord::{ChatSurface, Embed};
use crate::error::{JellycordError, Result};

use std::sync::Arc;

/// Whether an error says the referenced Discord resource no longer exists
pub(crate) fn is_stale(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<JellycordError>(),
        Some(JellycordError::StaleResource(_))
    )
}

/// Reconcile one embed panel against its display record
///
/// * No record: create the message and bind it.
/// * Record with matching fingerprint: no outbound call at all.
/// * Record with stale fingerprint: edit in place; if the message was
///   externally deleted, recreate it and rebind.
///
/// # Errors
///
/// Propagates Discord failures; the store is only updated after the
/// corresponding call succeeded, so a failed tick retries naturally.
pub(crate) async fn sync_panel(
    chat: &Arc<dyn ChatSurface>,
    store: &mut DisplayStateStore,
    key: DisplayKey,
    channel_id: &str,
    embed: &Embed,
    fingerprint: String,
) -> Result<()> {
    let Some(record) = store.get(&key).cloned() else {
        let message = chat.create_message(channel_id, embed).await?;
        tracing::info!("Created panel message {} in channel {}", message.id, channel_id);
        store.set(key, DisplayRecord::panel(channel_id, message.id, fingerprint));
        return Ok(());
    };

    if record.fingerprint == fingerprint {
        tracing::trace!("Panel unchanged, skipping edit");
        return Ok(());
    }

    let message_id = record.message_id.clone().unwrap_or_default();
    match chat.edit_message(&record.channel_id, &message_id, embed).await {
        Ok(()) => {
            store.set(
                key,
                DisplayRecord::panel(record.channel_id, message_id, fingerprint),
            );
            Ok(())
        }
        Err(e) if is_stale(&e) => {
            tracing::warn!(
                "Panel message {} disappeared, recreating in channel {}",
                message_id,
                channel_id
            );
            let message = chat.create_message(channel_id, embed).await?;
            store.set(key, DisplayRecord::panel(channel_id, message.id, fingerprint));
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Remove a panel message if one is bound
///
/// An already-deleted message counts as removed. On any other failure the
/// record is restored so the next tick retries the removal.
pub(crate) async fn clear_panel(
    chat: &Arc<dyn ChatSurface>,
    store: &mut DisplayStateStore,
    key: DisplayKey,
) -> Result<()> {
    let Some(record) = store.remove(&key) else {
        return Ok(());
    };

    let message_id = record.message_id.clone().unwrap_or_default();
    match chat.delete_message(&record.channel_id, &message_id).await {
        Ok(()) => {
            tracing::info!("Removed panel message {}", message_id);
            Ok(())
        }
        Err(e) if is_stale(&e) => Ok(()),
        Err(e) => {
            store.set(key, record);
            Err(e)
        }
    }
}
