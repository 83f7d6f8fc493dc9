use chrono::DateTime;
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;

use crate::config::{ConfigFile, Credentials};
use crate::error::{Error, Result};
use crate::types::{ErrorResponse, LoginRequest, LoginResponse};

pub const APPLICATION_ID_HEADER: &str = "X-Gizwits-Application-Id";
pub const USER_TOKEN_HEADER: &str = "X-Gizwits-User-token";

/// Convert an epoch expiry into the form stored in the configuration file.
pub fn format_expiry(expire_at: i64) -> String {
    match DateTime::from_timestamp(expire_at, 0) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => expire_at.to_string(),
    }
}

/// Owns the account credentials and keeps the stored token current.
pub struct Session {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    config: ConfigFile,
}

impl Session {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        credentials: Credentials,
        config: ConfigFile,
    ) -> Self {
        Self {
            client,
            base_url,
            credentials,
            config,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.token.as_deref()
    }

    fn app_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            APPLICATION_ID_HEADER,
            HeaderValue::from_str(&self.credentials.appid)?,
        );
        Ok(headers)
    }

    /// Headers identifying the application, plus the user token if we have one.
    pub fn headers(&self) -> Result<HeaderMap> {
        let mut headers = self.app_headers()?;
        if let Some(token) = self.token() {
            headers.insert(USER_TOKEN_HEADER, HeaderValue::from_str(token)?);
        }
        Ok(headers)
    }

    /// Log in with the stored login and password and persist the new token.
    ///
    /// On failure the stored credentials are left untouched.
    pub async fn authenticate(&mut self) -> Result<()> {
        debug!("Authenticating user: {}", self.credentials.login);

        let request = LoginRequest {
            username: &self.credentials.login,
            password: &self.credentials.password,
            lang: "en",
        };

        let response = self
            .client
            .post(format!("{}/login", self.base_url))
            .headers(self.app_headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("Login response ({}): {}", status, response_text);

        let body: Value = serde_json::from_str(&response_text).map_err(|_| {
            Error::Auth(format!("unexpected login response ({}): {}", status, response_text))
        })?;

        if let Some(error) = ErrorResponse::from_value(&body) {
            return Err(Error::Auth(error.message()));
        }

        let login: LoginResponse = serde_json::from_value(body)
            .map_err(|e| Error::MalformedResponse(format!("login: {}", e)))?;

        let mut updated = self.credentials.clone();
        updated.token = Some(login.token);
        updated.expiry = Some(format_expiry(login.expire_at));
        updated.save(&self.config)?;
        self.credentials = updated;

        info!(
            "Authenticated as {}, token valid until {}",
            self.credentials.login,
            self.credentials.expiry.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }
}
