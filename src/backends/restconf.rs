//! RESTCONF (RFC 8040) against the `ietf-interfaces` YANG model.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::traits::{BackendError, BackendResult, InterfaceState, StructuredConfigBackend};
use crate::command::BackendKind;
use crate::config::{DeviceConfig, InterfaceConfig, RestconfConfig};

const YANG_JSON: &str = "application/yang-data+json";
const MAX_ERROR_BODY_CHARS: usize = 300;

pub struct RestconfBackend {
    scheme: String,
    port: u16,
    username: String,
    password: Option<String>,
    interface: InterfaceConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct InterfaceStateReply {
    #[serde(rename = "ietf-interfaces:interface")]
    interface: Option<InterfaceStateEntry>,
}

#[derive(Debug, Deserialize)]
struct InterfaceStateEntry {
    #[serde(rename = "admin-status", default)]
    admin_status: Option<String>,
    #[serde(rename = "oper-status", default)]
    oper_status: Option<String>,
}

impl RestconfBackend {
    pub fn new(
        restconf: &RestconfConfig,
        device: &DeviceConfig,
        interface: InterfaceConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            scheme: restconf.scheme.clone(),
            port: restconf.port,
            username: device.username.clone(),
            password: device.password.clone(),
            interface,
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .danger_accept_invalid_certs(!restconf.verify_tls)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn data_url(&self, target: &str, container: &str) -> String {
        format!(
            "{}://{}:{}/restconf/data/ietf-interfaces:{}/interface={}",
            self.scheme,
            target,
            self.port,
            container,
            self.interface.name()
        )
    }

    fn config_url(&self, target: &str) -> String {
        self.data_url(target, "interfaces")
    }

    fn state_url(&self, target: &str) -> String {
        self.data_url(target, "interfaces-state")
    }

    pub fn create_body(&self) -> Value {
        json!({
            "ietf-interfaces:interface": {
                "name": self.interface.name(),
                "description": self.interface.description(),
                "type": "iana-if-type:softwareLoopback",
                "enabled": true,
                "ietf-ip:ipv4": {
                    "address": [{
                        "ip": self.interface.ipv4_address,
                        "netmask": self.interface.netmask,
                    }]
                }
            }
        })
    }

    fn enabled_body(&self, enabled: bool) -> Value {
        json!({
            "ietf-interfaces:interface": {
                "name": self.interface.name(),
                "type": "iana-if-type:softwareLoopback",
                "enabled": enabled,
            }
        })
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> BackendResult<reqwest::Response> {
        let mut request = self
            .client
            .request(method.clone(), &url)
            .basic_auth(&self.username, self.password.as_deref())
            .header(reqwest::header::ACCEPT, YANG_JSON);
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, YANG_JSON)
                .body(body.to_string());
        }

        let response = request.send().await?;
        tracing::debug!(%method, url = %url, status = response.status().as_u16(), "RESTCONF response");
        Ok(response)
    }

    async fn status_error(response: reqwest::Response) -> BackendError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        BackendError::Status {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    async fn expect_success(response: reqwest::Response) -> BackendResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(response).await)
        }
    }
}

#[async_trait]
impl StructuredConfigBackend for RestconfBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Restconf
    }

    async fn create(&self, target: &str) -> BackendResult<()> {
        let response = self
            .send(Method::PUT, self.config_url(target), Some(self.create_body()))
            .await?;
        Self::expect_success(response).await
    }

    async fn delete(&self, target: &str) -> BackendResult<()> {
        let response = self
            .send(Method::DELETE, self.config_url(target), None)
            .await?;
        Self::expect_success(response).await
    }

    async fn enable(&self, target: &str) -> BackendResult<()> {
        let response = self
            .send(
                Method::PATCH,
                self.config_url(target),
                Some(self.enabled_body(true)),
            )
            .await?;
        Self::expect_success(response).await
    }

    async fn disable(&self, target: &str) -> BackendResult<()> {
        let response = self
            .send(
                Method::PATCH,
                self.config_url(target),
                Some(self.enabled_body(false)),
            )
            .await?;
        Self::expect_success(response).await
    }

    async fn status(&self, target: &str) -> BackendResult<InterfaceState> {
        let response = self.send(Method::GET, self.state_url(target), None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(InterfaceState::Absent);
        }
        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(InterfaceState::Absent);
        }
        let reply: InterfaceStateReply = serde_json::from_str(&text)
            .map_err(|e| BackendError::Protocol(format!("invalid interface state: {e}")))?;
        Ok(match reply.interface {
            None => InterfaceState::Absent,
            Some(entry) => InterfaceState::from_statuses(
                entry.admin_status.as_deref().unwrap_or("down"),
                entry.oper_status.as_deref().unwrap_or("down"),
            ),
        })
    }
}
