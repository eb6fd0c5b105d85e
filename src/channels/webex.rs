//! Webex Messaging REST client.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::traits::{ChatTransport, InboundMessage, TransportError, TransportResult};
use crate::config::WebexConfig;

const MAX_ERROR_BODY_CHARS: usize = 300;

pub struct WebexTransport {
    api_url: String,
    access_token: String,
    room_id: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    items: Vec<WebexMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebexMessage {
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    person_email: Option<String>,
    created: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    emails: Vec<String>,
}

impl WebexTransport {
    pub fn new(api_url: &str, access_token: &str, room_id: &str, timeout: Duration) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            room_id: room_id.to_string(),
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    pub fn from_config(config: &WebexConfig) -> Self {
        Self::new(
            &config.api_url,
            config.access_token.as_deref().unwrap_or_default(),
            config.room_id.as_deref().unwrap_or_default(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn messages_url(&self) -> String {
        format!("{}/messages", self.api_url)
    }

    async fn check(response: reqwest::Response) -> TransportResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        })
    }
}

#[async_trait]
impl ChatTransport for WebexTransport {
    fn name(&self) -> &str {
        "webex"
    }

    async fn fetch_latest(&self) -> TransportResult<Option<InboundMessage>> {
        let response = self
            .client
            .get(self.messages_url())
            .bearer_auth(&self.access_token)
            .query(&[("roomId", self.room_id.as_str()), ("max", "1")])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let list: MessageList = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(list.items.into_iter().next().map(|m| InboundMessage {
            id: m.id,
            text: m.text.unwrap_or_default(),
            sender: m.person_email,
            created: m.created,
        }))
    }

    async fn post_text(&self, text: &str) -> TransportResult<()> {
        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .json(&json!({ "roomId": self.room_id, "text": text }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn post_file(&self, text: &str, filename: &str, bytes: Vec<u8>) -> TransportResult<()> {
        let file = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("text/plain")?;
        let form = Form::new()
            .text("roomId", self.room_id.clone())
            .text("text", text.to_string())
            .part("files", file);

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.access_token)
            .multipart(form)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> TransportResult<String> {
        let response = self
            .client
            .get(format!("{}/people/me", self.api_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let person: Person = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(person
            .display_name
            .or_else(|| person.emails.into_iter().next())
            .unwrap_or_else(|| "unknown".into()))
    }
}
