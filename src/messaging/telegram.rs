use super::{Messenger, SendOptions};
use crate::config::TelegramConfig;
use crate::error::Error;
use crate::pipeline::media::{MediaAsset, MediaKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const PARSE_MODE: &str = "Markdown";

/// Envelope every Bot API answer is wrapped in
#[derive(Debug, Deserialize)]
struct BotResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

/// Telegram Bot API client bound to one chat
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    chat_id: i64,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            chat_id: config.chat_id,
        })
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Check the token by asking who the bot is
    pub async fn get_me(&self) -> Result<BotUser> {
        let response = self
            .client
            .get(self.method_url("getMe"))
            .send()
            .await
            .map_err(|e| Error::Integration(format!("Error initializing telegram bot: {}", e)))?;
        Self::unwrap_response(response, "getMe")
            .await
            .map_err(|e| Error::Integration(format!("Error initializing telegram bot: {}", e)).into())
    }

    /// Long-poll for new updates starting at `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout_secs.to_string()),
            ])
            .timeout(Duration::from_secs(timeout_secs + 10))
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Error getting updates: {}", e)))?;
        Self::unwrap_response(response, "getUpdates").await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        response: reqwest::Response,
        method: &str,
    ) -> Result<T> {
        let status = response.status();
        let body: BotResponse<T> = response.json().await.map_err(|e| {
            Error::Messaging(format!("{} returned an unreadable answer ({}): {}", method, status, e))
        })?;

        if !body.ok {
            return Err(Error::Messaging(format!(
                "{} failed ({}): {}",
                method,
                status,
                body.description.unwrap_or_default()
            ))
            .into());
        }
        body.result
            .ok_or_else(|| Error::Messaging(format!("{} returned no result", method)).into())
    }

    async fn post_form(&self, method: &str, form: Form) -> Result<()> {
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Error sending {}: {}", method, e)))?;
        Self::unwrap_response::<serde_json::Value>(response, method).await?;
        debug!("{} delivered to chat {}", method, self.chat_id);
        Ok(())
    }

    async fn file_part(asset: &MediaAsset) -> Result<Part> {
        let bytes = tokio::fs::read(asset.path())
            .await
            .map_err(|e| Error::Io(format!("Error reading {}: {}", asset.path().display(), e)))?;
        Ok(Part::bytes(bytes).file_name(asset.kind.file_name()))
    }

    fn base_form(&self, options: SendOptions) -> Form {
        Form::new()
            .text("chat_id", self.chat_id.to_string())
            .text("disable_notification", options.silent.to_string())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, text: &str, options: SendOptions) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": PARSE_MODE,
                "disable_notification": options.silent,
            }))
            .send()
            .await
            .map_err(|e| Error::Messaging(format!("Error sending message: {}", e)))?;
        Self::unwrap_response::<serde_json::Value>(response, "sendMessage").await?;
        Ok(())
    }

    async fn send_media(
        &self,
        media: &[MediaAsset],
        caption: &str,
        options: SendOptions,
    ) -> Result<()> {
        match media {
            [] => self.send_text(caption, options).await,
            // media groups need at least two items
            [single] => {
                let (method, field) = match single.kind {
                    MediaKind::Image => ("sendPhoto", "photo"),
                    MediaKind::Video => ("sendVideo", "video"),
                };
                let form = self
                    .base_form(options)
                    .text("caption", caption.to_string())
                    .text("parse_mode", PARSE_MODE)
                    .part(field, Self::file_part(single).await?);
                self.post_form(method, form).await
            }
            many => {
                let mut form = self.base_form(options);
                let mut entries = Vec::with_capacity(many.len());
                for (index, asset) in many.iter().enumerate() {
                    let name = format!("file{}", index);
                    let kind = match asset.kind {
                        MediaKind::Image => "photo",
                        MediaKind::Video => "video",
                    };
                    let mut entry = json!({ "type": kind, "media": format!("attach://{}", name) });
                    if index == 0 {
                        entry["caption"] = json!(caption);
                        entry["parse_mode"] = json!(PARSE_MODE);
                    }
                    entries.push(entry);
                    form = form.part(name, Self::file_part(asset).await?);
                }
                let media_json = serde_json::to_string(&entries)
                    .map_err(|e| Error::Serialization(format!("Error encoding media group: {}", e)))?;
                self.post_form("sendMediaGroup", form.text("media", media_json))
                    .await
            }
        }
    }
}
