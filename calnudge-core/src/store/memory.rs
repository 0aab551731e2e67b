use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::local_time::LocalDateTime;
use crate::model::{
    Event, EventId, Friend, FriendId, PendingReminder, Reminder, ReminderId, User, UserId,
};
use crate::store::ReminderStore;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    events: BTreeMap<EventId, Event>,
    reminders: BTreeMap<ReminderId, Reminder>,
    friends: BTreeMap<FriendId, Friend>,
    event_friends: HashMap<EventId, Vec<FriendId>>,
    failing: HashSet<&'static str>,
}

/// In-process [`ReminderStore`]. Rows come back ordered by id.
///
/// Individual operations can be made to fail with [`MemoryStore::fail`], which
/// is how the pipeline's error paths are exercised.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_user(&self, user: User) {
        self.tables().users.insert(user.id, user);
    }

    pub fn insert_event(&self, event: Event) {
        self.tables().events.insert(event.id, event);
    }

    pub fn insert_reminder(&self, reminder: Reminder) {
        self.tables().reminders.insert(reminder.id, reminder);
    }

    pub fn insert_friend(&self, friend: Friend) {
        self.tables().friends.insert(friend.id, friend);
    }

    /// Replace the tagged friends of an event.
    pub fn set_event_friends(&self, event_id: EventId, friend_ids: Vec<FriendId>) {
        self.tables().event_friends.insert(event_id, friend_ids);
    }

    /// Delete an event together with its reminders and friend links.
    pub fn delete_event(&self, event_id: EventId) {
        let mut tables = self.tables();
        tables.events.remove(&event_id);
        tables.reminders.retain(|_, r| r.event_id != event_id);
        tables.event_friends.remove(&event_id);
    }

    pub fn reminder(&self, id: ReminderId) -> Option<Reminder> {
        self.tables().reminders.get(&id).cloned()
    }

    /// Make the named operation (e.g. `"pending_reminders"`) return an error.
    pub fn fail(&self, operation: &'static str) {
        self.tables().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.tables().failing.remove(operation);
    }

    fn check(tables: &Tables, operation: &'static str) -> StoreResult<()> {
        if tables.failing.contains(operation) {
            return Err(StoreError::backend(std::io::Error::other(format!(
                "{operation} is unavailable"
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn pending_reminders(&self) -> StoreResult<Vec<PendingReminder>> {
        let tables = self.tables();
        Self::check(&tables, "pending_reminders")?;

        Ok(tables
            .reminders
            .values()
            .filter(|r| !r.notified)
            .filter_map(|r| {
                tables.events.get(&r.event_id).map(|event| PendingReminder {
                    reminder: r.clone(),
                    event: event.clone(),
                })
            })
            .collect())
    }

    async fn mark_reminder_notified(&self, id: ReminderId, at: LocalDateTime) -> StoreResult<()> {
        let mut tables = self.tables();
        Self::check(&tables, "mark_reminder_notified")?;

        let reminder = tables
            .reminders
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "reminder", id })?;
        if !reminder.notified {
            reminder.notified = true;
            reminder.notified_at = Some(at);
        }
        Ok(())
    }

    async fn event_friends(&self, event_id: EventId) -> StoreResult<Vec<Friend>> {
        let tables = self.tables();
        Self::check(&tables, "event_friends")?;

        Ok(tables
            .event_friends
            .get(&event_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.friends.get(id).cloned())
            .collect())
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<User> {
        let tables = self.tables();
        Self::check(&tables, "user_by_id")?;

        tables
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "user", id })
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let tables = self.tables();
        Self::check(&tables, "list_events")?;
        Ok(tables.events.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Recurrence;

    fn event(id: EventId) -> Event {
        Event {
            id,
            owner_id: 1,
            calendar_id: None,
            title: "Standup".into(),
            description: None,
            location: None,
            start: LocalDateTime::from_ymd_hms(2025, 3, 20, 10, 0, 0).unwrap(),
            end: LocalDateTime::from_ymd_hms(2025, 3, 20, 10, 15, 0).unwrap(),
            all_day: false,
            recurrence: Recurrence::None,
            self_notify: false,
        }
    }

    #[tokio::test]
    async fn marking_twice_keeps_first_timestamp() {
        let store = MemoryStore::new();
        store.insert_event(event(1));
        store.insert_reminder(Reminder::new(10, 1, 15));

        let first = LocalDateTime::from_ymd_hms(2025, 3, 20, 9, 45, 0).unwrap();
        let second = LocalDateTime::from_ymd_hms(2025, 3, 20, 9, 46, 0).unwrap();
        store.mark_reminder_notified(10, first).await.unwrap();
        store.mark_reminder_notified(10, second).await.unwrap();

        let reminder = store.reminder(10).unwrap();
        assert!(reminder.notified);
        assert_eq!(reminder.notified_at, Some(first));
        assert!(store.pending_reminders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_event_cascades_to_reminders() {
        let store = MemoryStore::new();
        store.insert_event(event(1));
        store.insert_reminder(Reminder::new(10, 1, 15));
        store.set_event_friends(1, vec![5]);

        store.delete_event(1);

        assert!(store.reminder(10).is_none());
        assert!(store.event_friends(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_operation_reports_backend_error() {
        let store = MemoryStore::new();
        store.fail("pending_reminders");
        assert!(matches!(
            store.pending_reminders().await,
            Err(StoreError::Backend(_))
        ));
        store.recover("pending_reminders");
        assert!(store.pending_reminders().await.is_ok());
    }
}
