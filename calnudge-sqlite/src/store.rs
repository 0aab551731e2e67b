//! Reminder queries.

use async_trait::async_trait;
use calnudge_core::error::{StoreError, StoreResult};
use calnudge_core::local_time::LocalDateTime;
use calnudge_core::store::ReminderStore;
use calnudge_core::{
    Event, EventId, Friend, FriendId, PendingReminder, Reminder, ReminderId, User, UserId,
};
use tracing::{debug, warn};

use crate::connection::SqliteStore;
use crate::rows::{EventRow, FriendRow, PendingRow, UserRow};

const EVENT_COLUMNS: &str = "e.id AS id, e.owner_id AS owner_id, e.calendar_id AS calendar_id, \
     e.title AS title, e.description AS description, e.location AS location, \
     e.start_time AS start_time, e.end_time AS end_time, e.all_day AS all_day, \
     e.recurrence AS recurrence, e.self_notify AS self_notify";

#[async_trait]
impl ReminderStore for SqliteStore {
    async fn pending_reminders(&self) -> StoreResult<Vec<PendingReminder>> {
        let sql = format!(
            "SELECT r.id AS reminder_id, r.minutes_before, r.notified, r.notified_at, \
                    r.custom_message, {EVENT_COLUMNS} \
             FROM reminders r \
             JOIN events e ON e.id = r.event_id \
             WHERE r.notified = 0 \
             ORDER BY r.id"
        );

        let rows: Vec<PendingRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        // A malformed row is skipped so it cannot hold up every other reminder.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let reminder_id = row.reminder_id;
                PendingReminder::try_from(row)
                    .inspect_err(|e| warn!(reminder_id, "Skipping unreadable reminder: {}", e))
                    .ok()
            })
            .collect())
    }

    async fn mark_reminder_notified(&self, id: ReminderId, at: LocalDateTime) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE reminders SET notified = 1, notified_at = ? WHERE id = ? AND notified = 0",
        )
        .bind(at.to_storage_string())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM reminders WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::backend)?;
            if exists.is_none() {
                return Err(StoreError::NotFound { entity: "reminder", id });
            }
            debug!(reminder_id = id, "Reminder was already notified");
        }
        Ok(())
    }

    async fn event_friends(&self, event_id: EventId) -> StoreResult<Vec<Friend>> {
        let rows: Vec<FriendRow> = sqlx::query_as(
            "SELECT f.id, f.owner_id, f.name, f.chat_id, f.username, f.color \
             FROM friends f \
             JOIN event_friends ef ON ef.friend_id = f.id \
             WHERE ef.event_id = ? \
             ORDER BY f.id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Friend::from).collect())
    }

    async fn user_by_id(&self, id: UserId) -> StoreResult<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, name, bot_token, chat_id, username FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        row.map(User::from)
            .ok_or(StoreError::NotFound { entity: "user", id })
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.start_time, e.id");
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        rows.into_iter().map(Event::try_from).collect()
    }
}

/// Writes used to seed the database. Ids of `0` are assigned by SQLite.
impl SqliteStore {
    pub async fn insert_user(&self, user: &User) -> StoreResult<UserId> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, bot_token, chat_id, username) \
             VALUES (NULLIF(?, 0), ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.bot_token)
        .bind(&user.chat_id)
        .bind(&user.username)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_event(&self, event: &Event) -> StoreResult<EventId> {
        let result = sqlx::query(
            "INSERT INTO events (id, owner_id, calendar_id, title, description, location, \
                                 start_time, end_time, all_day, recurrence, self_notify) \
             VALUES (NULLIF(?, 0), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(event.id)
        .bind(event.owner_id)
        .bind(event.calendar_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.start.to_storage_string())
        .bind(event.end.to_storage_string())
        .bind(event.all_day)
        .bind(event.recurrence.as_str())
        .bind(event.self_notify)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_reminder(&self, reminder: &Reminder) -> StoreResult<ReminderId> {
        let result = sqlx::query(
            "INSERT INTO reminders (id, event_id, minutes_before, notified, notified_at, custom_message) \
             VALUES (NULLIF(?, 0), ?, ?, ?, ?, ?)",
        )
        .bind(reminder.id)
        .bind(reminder.event_id)
        .bind(reminder.minutes_before)
        .bind(reminder.notified)
        .bind(reminder.notified_at.map(|at| at.to_storage_string()))
        .bind(&reminder.custom_message)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_friend(&self, friend: &Friend) -> StoreResult<FriendId> {
        let result = sqlx::query(
            "INSERT INTO friends (id, owner_id, name, chat_id, username, color) \
             VALUES (NULLIF(?, 0), ?, ?, ?, ?, ?)",
        )
        .bind(friend.id)
        .bind(friend.owner_id)
        .bind(&friend.name)
        .bind(&friend.chat_id)
        .bind(&friend.username)
        .bind(&friend.color)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;
        Ok(result.last_insert_rowid())
    }

    /// Replace the tagged friends of an event wholesale.
    pub async fn set_event_friends(
        &self,
        event_id: EventId,
        friend_ids: &[FriendId],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        sqlx::query("DELETE FROM event_friends WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

        for friend_id in friend_ids {
            sqlx::query("INSERT INTO event_friends (event_id, friend_id) VALUES (?, ?)")
                .bind(event_id)
                .bind(*friend_id)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)
    }

    /// Replace an event's reminders with fresh, unnotified ones.
    pub async fn replace_reminders(
        &self,
        event_id: EventId,
        minutes_before: &[i64],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;

        sqlx::query("DELETE FROM reminders WHERE event_id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

        for minutes in minutes_before {
            sqlx::query("INSERT INTO reminders (event_id, minutes_before) VALUES (?, ?)")
                .bind(event_id)
                .bind(*minutes)
                .execute(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)
    }

    /// Delete an event; reminders and friend links cascade.
    pub async fn delete_event(&self, event_id: EventId) -> StoreResult<()> {
        sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calnudge_core::Recurrence;

    fn at(day: u32, hour: u32, minute: u32) -> LocalDateTime {
        LocalDateTime::from_ymd_hms(2025, 3, day, hour, minute, 0).unwrap()
    }

    fn user() -> User {
        User {
            id: 1,
            name: "Mika".into(),
            bot_token: Some("123:abc".into()),
            chat_id: Some("42".into()),
            username: Some("mika".into()),
        }
    }

    fn event(id: EventId, recurrence: Recurrence) -> Event {
        Event {
            id,
            owner_id: 1,
            calendar_id: None,
            title: format!("Event {id}"),
            description: None,
            location: Some("Kyoto".into()),
            start: at(20, 14, 30),
            end: at(20, 15, 0),
            all_day: false,
            recurrence,
            self_notify: true,
        }
    }

    fn friend(id: FriendId, chat_id: &str) -> Friend {
        Friend {
            id,
            owner_id: 1,
            name: format!("Friend {id}"),
            chat_id: Some(chat_id.into()),
            username: None,
            color: "#f59e0b".into(),
        }
    }

    async fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.insert_user(&user()).await.unwrap();
        store.insert_event(&event(1, Recurrence::Monthly)).await.unwrap();
        store.insert_reminder(&Reminder::new(1, 1, 15)).await.unwrap();
        store.insert_reminder(&Reminder::new(2, 1, 60)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn pending_reminders_join_their_event() {
        let store = seeded().await;

        let pending = store.pending_reminders().await.unwrap();

        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].reminder.id, 1);
        assert_eq!(pending[1].reminder.minutes_before, 60);
        assert_eq!(pending[0].event, event(1, Recurrence::Monthly));
    }

    async fn insert_raw_event(store: &SqliteStore, id: EventId, start: &str) {
        sqlx::query(
            "INSERT INTO events (id, owner_id, title, start_time, end_time) \
             VALUES (?, 1, 'Imported', ?, ?)",
        )
        .bind(id)
        .bind(start)
        .bind(start)
        .execute(store.pool())
        .await
        .unwrap();
        store.insert_reminder(&Reminder::new(id * 10, id, 15)).await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_row_is_skipped_not_fatal() {
        let store = seeded().await;
        insert_raw_event(&store, 2, "2025-03-20 14:30").await;
        insert_raw_event(&store, 3, "next tuesday").await;

        let pending = store.pending_reminders().await.unwrap();

        let ids: Vec<ReminderId> = pending.iter().map(|p| p.reminder.id).collect();
        assert_eq!(ids, vec![1, 2, 20]);
        assert_eq!(pending[2].event.start, at(20, 14, 30));
    }

    #[tokio::test]
    async fn marked_reminder_leaves_pending_set_for_good() {
        let store = seeded().await;

        store.mark_reminder_notified(1, at(20, 14, 15)).await.unwrap();
        store.mark_reminder_notified(1, at(20, 14, 16)).await.unwrap();

        let pending = store.pending_reminders().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].reminder.id, 2);

        let stamped: Option<String> =
            sqlx::query_scalar("SELECT notified_at FROM reminders WHERE id = 1")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(stamped.as_deref(), Some("2025-03-20 14:15:00"));
    }

    #[tokio::test]
    async fn marking_unknown_reminder_is_not_found() {
        let store = seeded().await;
        assert!(matches!(
            store.mark_reminder_notified(99, at(20, 14, 15)).await,
            Err(StoreError::NotFound { entity: "reminder", id: 99 })
        ));
    }

    #[tokio::test]
    async fn event_friends_are_replaced_wholesale() {
        let store = seeded().await;
        for (id, chat) in [(1, "100"), (2, "200"), (3, "300")] {
            store.insert_friend(&friend(id, chat)).await.unwrap();
        }

        store.set_event_friends(1, &[1, 2]).await.unwrap();
        store.set_event_friends(1, &[2, 3]).await.unwrap();

        let ids: Vec<FriendId> = store
            .event_friends(1)
            .await
            .unwrap()
            .iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test]
    async fn deleting_event_cascades() {
        let store = seeded().await;
        store.insert_friend(&friend(1, "100")).await.unwrap();
        store.set_event_friends(1, &[1]).await.unwrap();

        store.delete_event(1).await.unwrap();

        assert!(store.pending_reminders().await.unwrap().is_empty());
        assert!(store.event_friends(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replacing_reminders_resets_notified_state() {
        let store = seeded().await;
        store.mark_reminder_notified(1, at(20, 14, 15)).await.unwrap();

        store.replace_reminders(1, &[5, 1440]).await.unwrap();

        let minutes: Vec<i64> = store
            .pending_reminders()
            .await
            .unwrap()
            .iter()
            .map(|p| p.reminder.minutes_before)
            .collect();
        assert_eq!(minutes, vec![5, 1440]);
    }

    #[tokio::test]
    async fn user_lookup() {
        let store = seeded().await;
        assert_eq!(store.user_by_id(1).await.unwrap(), user());
        assert!(matches!(
            store.user_by_id(2).await,
            Err(StoreError::NotFound { entity: "user", .. })
        ));
    }

    #[tokio::test]
    async fn list_events_orders_by_start() {
        let store = seeded().await;
        let mut earlier = event(2, Recurrence::None);
        earlier.start = at(19, 9, 0);
        earlier.end = at(19, 10, 0);
        store.insert_event(&earlier).await.unwrap();

        let ids: Vec<EventId> = store.list_events().await.unwrap().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn invalid_recurrence_is_rejected_by_schema() {
        let store = seeded().await;
        let result = sqlx::query(
            "INSERT INTO events (owner_id, title, start_time, end_time, recurrence) \
             VALUES (1, 'x', '2025-03-20 10:00:00', '2025-03-20 11:00:00', 'hourly')",
        )
        .execute(store.pool())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn file_database_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("calnudge.db");

        let store = SqliteStore::open(&path).await.unwrap();
        store.insert_user(&user()).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.user_by_id(1).await.unwrap().name, "Mika");
    }
}
