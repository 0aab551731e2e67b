//! The delivery collaborator.

use async_trait::async_trait;

use crate::error::DeliveryResult;
use crate::model::User;

/// Sends text through a user's configured messaging bot.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver `text` via `owner`'s bot, to the owner's own chat or to
    /// `override_chat_id` when given. `Ok` means the platform accepted it.
    async fn send_message(
        &self,
        owner: &User,
        text: &str,
        override_chat_id: Option<&str>,
    ) -> DeliveryResult<()>;
}
