//! Fan-out of one reminder to its owner and tagged friends.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::compose::{owner_mention, test_message, with_mention};
use crate::constants::DEFAULT_SEND_TIMEOUT;
use crate::error::{DeliveryError, NudgeResult};
use crate::messenger::Messenger;
use crate::model::{Event, Reminder, User, UserId};
use crate::store::ReminderStore;

/// Outcome of dispatching one reminder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted_owner: bool,
    pub owner_sent: bool,
    pub friends_attempted: usize,
    pub friends_sent: usize,
}

impl DispatchReport {
    pub fn any_sent(&self) -> bool {
        self.owner_sent || self.friends_sent > 0
    }
}

/// Resolves recipients and delivers through the owner's bot.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn ReminderStore>,
    messenger: Arc<dyn Messenger>,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ReminderStore>, messenger: Arc<dyn Messenger>) -> Self {
        Dispatcher {
            store,
            messenger,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Deliver `message` for `reminder`. Never fails: every recipient's
    /// outcome is logged and counted in the report.
    pub async fn dispatch(&self, event: &Event, reminder: &Reminder, message: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        // Friends are reached through the owner's bot, so nothing can be sent without the owner.
        let owner = match self.store.user_by_id(event.owner_id).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(
                    reminder_id = reminder.id,
                    event_id = event.id,
                    owner_id = event.owner_id,
                    "Could not resolve event owner: {}",
                    e
                );
                return report;
            }
        };

        let owner_text = with_mention(message, owner_mention(event, &owner));
        report.attempted_owner = true;
        report.owner_sent = self.send(&owner, &owner_text, None, reminder).await;

        let friends = match self.store.event_friends(event.id).await {
            Ok(friends) => friends,
            Err(e) => {
                warn!(
                    reminder_id = reminder.id,
                    event_id = event.id,
                    "Could not resolve tagged friends: {}",
                    e
                );
                return report;
            }
        };

        let sends: Vec<_> = friends
            .iter()
            .filter_map(|friend| match friend.deliverable_chat_id() {
                Some(chat_id) => Some(self.send(&owner, message, Some(chat_id), reminder)),
                None => {
                    debug!(friend_id = friend.id, "Friend has no chat id, skipping");
                    None
                }
            })
            .collect();

        let outcomes = join_all(sends).await;
        report.friends_attempted = outcomes.len();
        report.friends_sent = outcomes.into_iter().filter(|sent| *sent).count();

        info!(
            reminder_id = reminder.id,
            event_id = event.id,
            owner_sent = report.owner_sent,
            friends_sent = report.friends_sent,
            friends_attempted = report.friends_attempted,
            "Reminder dispatched"
        );

        report
    }

    async fn send(
        &self,
        owner: &User,
        text: &str,
        override_chat_id: Option<&str>,
        reminder: &Reminder,
    ) -> bool {
        let recipient = override_chat_id.unwrap_or("owner");
        let outcome = tokio::time::timeout(
            self.send_timeout,
            self.messenger.send_message(owner, text, override_chat_id),
        )
        .await
        .unwrap_or(Err(DeliveryError::Timeout(self.send_timeout)));

        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!(reminder_id = reminder.id, recipient, "Delivery failed: {}", e);
                false
            }
        }
    }

    /// Send the diagnostic test text to a user's own chat.
    pub async fn send_test_message(&self, user_id: UserId) -> NudgeResult<()> {
        let user = self.store.user_by_id(user_id).await?;
        let text = test_message(&user);

        tokio::time::timeout(self.send_timeout, self.messenger.send_message(&user, &text, None))
            .await
            .unwrap_or(Err(DeliveryError::Timeout(self.send_timeout)))?;
        Ok(())
    }
}
