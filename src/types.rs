use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DeviceRecord;

/// Gizwits error code for an invalid or expired user token.
pub const TOKEN_INVALID_CODE: i64 = 9004;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub lang: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expire_at: i64,
}

/// Error body returned by the cloud for any failed call.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error_message: String,
    pub error_code: Option<i64>,
    pub detail_message: Option<String>,
}

impl ErrorResponse {
    /// Returns the error carried by `body`, if it is an error body.
    pub fn from_value(body: &Value) -> Option<Self> {
        body.get("error_message")?;
        serde_json::from_value(body.clone()).ok()
    }

    pub fn message(&self) -> String {
        match &self.detail_message {
            Some(detail) if !detail.is_empty() => format!("{} ({})", self.error_message, detail),
            _ => self.error_message.clone(),
        }
    }

    /// Whether the server rejected the user token.
    ///
    /// The error code is authoritative; older endpoints only say so in the
    /// message text.
    pub fn is_token_failure(&self) -> bool {
        match self.error_code {
            Some(TOKEN_INVALID_CODE) => true,
            _ => {
                self.error_message.to_ascii_lowercase().contains("token")
                    || self
                        .detail_message
                        .as_deref()
                        .is_some_and(|d| d.to_ascii_lowercase().contains("token"))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Binding {
    pub did: String,
    pub product_name: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub dev_alias: String,
}

impl From<Binding> for DeviceRecord {
    fn from(binding: Binding) -> Self {
        Self {
            did: binding.did,
            product: binding.product_name,
            mac: binding.mac,
            alias: binding.dev_alias,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BindingsResponse {
    pub devices: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
pub struct DeviceStatus {
    pub is_online: bool,
}

#[derive(Debug, Deserialize)]
pub struct LatestData {
    pub attr: Option<LatestAttributes>,
}

#[derive(Debug, Deserialize)]
pub struct LatestAttributes {
    pub mode: Option<String>,
}

impl LatestData {
    pub fn mode(&self) -> Option<&str> {
        self.attr.as_ref()?.mode.as_deref()
    }
}
