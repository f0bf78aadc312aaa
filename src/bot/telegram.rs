use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use super::commands::Command;
use super::context::BotContext;
use super::telegram_types::{SendMessage, TgResponse, Update};
use super::{Notifier, NotifyError};
use crate::settings::TelegramSettings;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const LONG_POLL_SECS: u64 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct TelegramClient {
    client: reqwest::Client,
    base: String,
    chat_id: i64,
}

impl TelegramClient {
    pub fn new(settings: &TelegramSettings) -> reqwest::Result<Self> {
        Self::with_base_url(settings, TELEGRAM_API_URL)
    }

    pub fn with_base_url(settings: &TelegramSettings, api_url: &str) -> reqwest::Result<Self> {
        // must outlive the long poll
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()?;
        Ok(Self {
            client,
            base: format!("{}/bot{}", api_url.trim_end_matches('/'), settings.token),
            chat_id: settings.chat_id,
        })
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    #[instrument(level = "debug", skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        let body =
            SendMessage { chat_id, text, parse_mode: "HTML", disable_web_page_preview: true };
        let resp = self.client.post(format!("{}/sendMessage", self.base)).json(&body).send().await?;
        let parsed: TgResponse<serde_json::Value> = resp.json().await?;
        unwrap_response(parsed).map(|_| ())
    }

    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, NotifyError> {
        let resp = self
            .client
            .get(format!("{}/getUpdates", self.base))
            .query(&[("offset", offset.to_string()), ("timeout", timeout_secs.to_string())])
            .send()
            .await?;
        let parsed: TgResponse<Vec<Update>> = resp.json().await?;
        unwrap_response(parsed)
    }
}

fn unwrap_response<T>(resp: TgResponse<T>) -> Result<T, NotifyError> {
    match resp {
        TgResponse { ok: true, result: Some(result), .. } => Ok(result),
        TgResponse { description, error_code, .. } => Err(NotifyError::Api {
            code: error_code,
            description: description.unwrap_or_else(|| "empty response".to_string()),
        }),
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        self.send_message(self.chat_id, text).await
    }
}

/// Long-poll for commands until the task is cancelled. Replies go back to the
/// chat the command came from.
pub async fn run_polling(ctx: Arc<BotContext>, tg: Arc<TelegramClient>) {
    let mut offset = 0i64;
    info!("Polling Telegram for commands");

    loop {
        let updates = match tg.get_updates(offset, LONG_POLL_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed; backing off");
                tokio::time::sleep(ERROR_BACKOFF).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else { continue };
            let Some(text) = message.text.as_deref() else { continue };
            // plain chat messages are ignored
            if !text.starts_with('/') {
                continue;
            }
            let Some(command) = Command::parse(text) else { continue };

            debug!(chat_id = message.chat.id, command = command.name(), "Command received");
            let reply = ctx.handle(command).await;
            if let Err(e) = tg.send_message(message.chat.id, &reply).await {
                warn!(chat_id = message.chat.id, error = %e, "Failed to send reply");
            }
        }
    }
}
