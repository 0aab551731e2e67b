//! The persistence collaborator.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::local_time::LocalDateTime;
use crate::model::{Event, EventId, Friend, PendingReminder, ReminderId, User, UserId};

/// Query/write operations the reminder pipeline needs from storage.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// All reminders with `notified = false`, joined with their event, in a stable order.
    async fn pending_reminders(&self) -> StoreResult<Vec<PendingReminder>>;

    /// Set `notified` and stamp `notified_at`. Marking an already-notified
    /// reminder succeeds and leaves the original timestamp untouched.
    async fn mark_reminder_notified(&self, id: ReminderId, at: LocalDateTime) -> StoreResult<()>;

    async fn event_friends(&self, event_id: EventId) -> StoreResult<Vec<Friend>>;

    async fn user_by_id(&self, id: UserId) -> StoreResult<User>;

    async fn list_events(&self) -> StoreResult<Vec<Event>>;
}
