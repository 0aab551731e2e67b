//! Selecting the reminders whose notify time has arrived.

use crate::error::StoreResult;
use crate::local_time::LocalDateTime;
use crate::model::PendingReminder;
use crate::store::ReminderStore;

/// Whether a pending reminder is due at `now` (inclusive).
///
/// Only the event's literal start is considered; later occurrences of a
/// recurring event are not projected.
pub fn is_due(pending: &PendingReminder, now: LocalDateTime) -> bool {
    pending.notify_time() <= now
}

/// Unnotified reminders that are due at `now`, in store order.
pub async fn due_reminders(
    store: &dyn ReminderStore,
    now: LocalDateTime,
) -> StoreResult<Vec<PendingReminder>> {
    let pending = store.pending_reminders().await?;
    Ok(pending.into_iter().filter(|p| is_due(p, now)).collect())
}
