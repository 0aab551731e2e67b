//! Delivers calnudge reminders through the Telegram Bot API.
//!
//! Each user brings their own bot; messages for their friends go out
//! through that same bot, addressed to the friend's chat id.

use std::time::Duration;

use async_trait::async_trait;
use calnudge_core::User;
use calnudge_core::error::{DeliveryError, DeliveryResult};
use calnudge_core::messenger::Messenger;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// [`Messenger`] backed by `sendMessage`.
#[derive(Debug, Clone)]
pub struct TelegramMessenger {
    client: reqwest::Client,
    api_base: String,
    timeout: Duration,
}

impl TelegramMessenger {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> DeliveryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        Ok(TelegramMessenger {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn send_message_url(&self, bot_token: &str) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, bot_token)
    }

    fn transport_error(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else {
            // The URL carries the bot token.
            DeliveryError::Transport(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(
        &self,
        owner: &User,
        text: &str,
        override_chat_id: Option<&str>,
    ) -> DeliveryResult<()> {
        let bot_token =
            non_blank(owner.bot_token.as_deref()).ok_or(DeliveryError::MissingBotToken(owner.id))?;
        let chat_id = match override_chat_id {
            Some(chat_id) => non_blank(Some(chat_id)),
            None => non_blank(owner.chat_id.as_deref()),
        }
        .ok_or(DeliveryError::MissingChatId(owner.id))?;

        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.send_message_url(bot_token))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.json::<ApiResponse>().await;

        match body {
            Ok(body) if status.is_success() && body.ok => {
                debug!(owner_id = owner.id, chat_id, "Telegram accepted message");
                Ok(())
            }
            Ok(body) => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: body
                    .description
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            }),
            Err(_) if !status.is_success() => Err(DeliveryError::Rejected {
                status: status.as_u16(),
                description: status.canonical_reason().unwrap_or("unknown").to_string(),
            }),
            Err(e) => Err(self.transport_error(e)),
        }
    }
}
