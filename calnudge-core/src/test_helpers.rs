#![cfg(test)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DeliveryError, DeliveryResult};
use crate::local_time::LocalDateTime;
use crate::messenger::Messenger;
use crate::model::{Event, Friend, Recurrence, Reminder, User};
use crate::store::MemoryStore;

/// A delivered (or attempted) message.
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub bot_owner: i64,
    pub chat_id: String,
    pub text: String,
}

/// Messenger that records every attempt and fails, stalls or panics on demand.
#[derive(Default)]
pub struct RecordingMessenger {
    attempts: Mutex<Vec<Sent>>,
    failing_chats: Mutex<HashSet<String>>,
    stalling_chats: Mutex<HashSet<String>>,
    panic_next: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_chat(&self, chat_id: &str) {
        self.failing_chats.lock().unwrap().insert(chat_id.to_string());
    }

    pub fn stall_chat(&self, chat_id: &str) {
        self.stalling_chats.lock().unwrap().insert(chat_id.to_string());
    }

    /// Panic on the next send, after recording it.
    pub fn panic_once(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> Vec<Sent> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_to(&self, chat_id: &str) -> Vec<Sent> {
        self.attempts()
            .into_iter()
            .filter(|s| s.chat_id == chat_id)
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        owner: &User,
        text: &str,
        override_chat_id: Option<&str>,
    ) -> DeliveryResult<()> {
        let chat_id = match override_chat_id {
            Some(chat) => chat.to_string(),
            None => owner.chat_id.clone().ok_or(DeliveryError::MissingChatId(owner.id))?,
        };
        self.attempts.lock().unwrap().push(Sent {
            bot_owner: owner.id,
            chat_id: chat_id.clone(),
            text: text.to_string(),
        });

        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("messenger failure on chat {chat_id}");
        }

        let stalls = self.stalling_chats.lock().unwrap().contains(&chat_id);
        let fails = self.failing_chats.lock().unwrap().contains(&chat_id);

        if stalls {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if fails {
            return Err(DeliveryError::Rejected {
                status: 400,
                description: "Bad Request: chat not found".into(),
            });
        }
        Ok(())
    }
}

pub fn at(hour: u32, minute: u32, second: u32) -> LocalDateTime {
    LocalDateTime::from_ymd_hms(2025, 3, 20, hour, minute, second).unwrap()
}

pub fn owner() -> User {
    User {
        id: 1,
        name: "Mika".into(),
        bot_token: Some("123:abc".into()),
        chat_id: Some("owner-chat".into()),
        username: Some("mika".into()),
    }
}

pub fn event(id: i64) -> Event {
    Event {
        id,
        owner_id: 1,
        calendar_id: None,
        title: format!("Event {id}"),
        description: None,
        location: None,
        start: at(14, 30, 0),
        end: at(15, 0, 0),
        all_day: false,
        recurrence: Recurrence::None,
        self_notify: false,
    }
}

pub fn friend(id: i64, chat_id: Option<&str>) -> Friend {
    Friend {
        id,
        owner_id: 1,
        name: format!("Friend {id}"),
        chat_id: chat_id.map(String::from),
        username: None,
        color: "#3b82f6".into(),
    }
}

/// Owner plus event 1 with a 15-minute reminder (id 1), due at 14:15.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_user(owner());
    store.insert_event(event(1));
    store.insert_reminder(Reminder::new(1, 1, 15));
    store
}
