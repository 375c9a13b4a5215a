use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{DeliveryError, NotificationSink};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers messages through the Telegram Bot API `sendMessage` call.
#[derive(Clone)]
pub struct TelegramSink {
    http: Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let token = token.into();
        let chat_id = chat_id.into();
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(DeliveryError::Config(
                "telegram token and chat id are required".into(),
            ));
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            chat_id,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

/// Success needs both a 2xx status and `"ok": true`; anything else is a
/// rejection carrying Telegram's description or the start of the body.
fn interpret_reply(status: StatusCode, body: &str) -> Result<(), DeliveryError> {
    match serde_json::from_str::<ApiResponse>(body).ok() {
        Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
        Some(ApiResponse { description, .. }) => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description: description.unwrap_or_else(|| "no description".into()),
        }),
        None => Err(DeliveryError::Rejected {
            status: status.as_u16(),
            description: body.chars().take(200).collect(),
        }),
    }
}

// keeps the bot token out of `{:?}` output
impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink")
            .field("base_url", &self.base_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    #[instrument(skip(self, message), fields(chars = message.len()))]
    async fn dispatch(&self, message: &str, formatted: bool) -> Result<(), DeliveryError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: formatted.then_some("HTML"),
            disable_web_page_preview: true,
        };

        let resp = self.http.post(self.endpoint()).json(&payload).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        interpret_reply(status, &body)?;
        debug!("telegram message delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
