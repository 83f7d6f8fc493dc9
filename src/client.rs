use log::{debug, info, warn};
use reqwest::Method;
use serde_json::Value;

use crate::auth::Session;
use crate::config::{ConfigFile, Credentials, DeviceRecord, Registry};
use crate::error::{Error, Result};
use crate::state::{self, DeviceState, HeatingState, Product};
use crate::types::{BindingsResponse, DeviceStatus, ErrorResponse, LatestData};

pub const DEFAULT_BASE_URL: &str = "https://euapi.gizwits.com/app";

/// A call against the cloud API, kept so it can be replayed after a new login.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

pub struct HeatzyClient {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HeatzyClient {
    pub fn new(credentials: Credentials, config: ConfigFile) -> Self {
        Self::new_with_base_url(credentials, config, DEFAULT_BASE_URL.to_string())
    }

    pub fn new_with_base_url(credentials: Credentials, config: ConfigFile, base_url: String) -> Self {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();
        let session = Session::new(client.clone(), base_url.clone(), credentials, config);
        Self {
            client,
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn authenticate(&mut self) -> Result<()> {
        self.session.authenticate().await
    }

    /// Run `request` with the current token.
    ///
    /// If the server rejects the token, log in again once and replay the
    /// request once. Whatever the replay returns is final, even another token
    /// rejection. Without a stored token we log in first and send once.
    pub async fn execute(&mut self, request: &ApiRequest) -> Result<Value> {
        self.dispatch(request, &mut false).await
    }

    /// `execute` sharing one login allowance across the requests of a
    /// command. Once `reauthenticated` is set, responses are returned as is.
    async fn dispatch(&mut self, request: &ApiRequest, reauthenticated: &mut bool) -> Result<Value> {
        if self.session.token().is_none() && !*reauthenticated {
            info!("No stored token, logging in");
            *reauthenticated = true;
            self.session.authenticate().await?;
            return self.send(request).await;
        }

        let body = self.send(request).await?;
        if *reauthenticated {
            return Ok(body);
        }
        match ErrorResponse::from_value(&body) {
            Some(error) if error.is_token_failure() => {
                info!("Token rejected ({}), logging in again", error.message());
                *reauthenticated = true;
                self.session.authenticate().await?;
                self.send(request).await
            }
            _ => Ok(body),
        }
    }

    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(self.session.headers()?);
        if let Some(body) = &request.body {
            debug!("Request body: {}", body);
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let response_text = response.text().await?;
        debug!("Response ({}): {}", status, response_text);

        if response_text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response_text).map_err(|_| {
            Error::MalformedResponse(format!(
                "{} {} returned {}: {}",
                request.method, request.path, status, response_text
            ))
        })
    }

    /// Current state of `device`. Offline devices are not decoded.
    ///
    /// Reads the online flag, then the latest mode; both reads share a single
    /// login retry.
    pub async fn get_state(&mut self, device: &DeviceRecord) -> Result<DeviceState> {
        let product: Product = device.product.parse()?;
        let mut reauthenticated = false;

        let status = self
            .dispatch(
                &ApiRequest::get(format!("/devices/{}", device.did)),
                &mut reauthenticated,
            )
            .await?;
        check_api_error(&status)?;
        let status: DeviceStatus = match serde_json::from_value(status) {
            Ok(status) => status,
            Err(e) => {
                warn!("Could not read online status of {}: {}", device.did, e);
                return Ok(DeviceState::Unknown);
            }
        };
        if !status.is_online {
            debug!("Device {} is offline", device.did);
            return Ok(DeviceState::Offline);
        }

        let latest = self
            .dispatch(
                &ApiRequest::get(format!("/devdata/{}/latest", device.did)),
                &mut reauthenticated,
            )
            .await?;
        check_api_error(&latest)?;
        let mode = serde_json::from_value::<LatestData>(latest)
            .ok()
            .and_then(|data| data.mode().map(str::to_string));

        let Some(mode) = mode else {
            warn!("No mode reported for device {}", device.did);
            return Ok(DeviceState::Unknown);
        };
        match state::decode(product, &mode) {
            Ok(state) => Ok(DeviceState::State(state)),
            Err(e) => {
                warn!("{}", e);
                Ok(DeviceState::Unknown)
            }
        }
    }

    /// Put `device` in `state` and return the state that was requested.
    pub async fn set_state(&mut self, device: &DeviceRecord, state: HeatingState) -> Result<HeatingState> {
        let product: Product = device.product.parse()?;
        let token = state::encode(product, state);
        debug!("Setting {} ({}) to {} as {:?}", device.did, product, state, token);

        let body = self
            .execute(&ApiRequest::post(
                format!("/control/{}", device.did),
                token.to_payload(),
            ))
            .await?;
        check_api_error(&body)?;

        info!("Device {} set to {}", device.did, state);
        Ok(state)
    }

    /// Fetch the bound devices and rebuild the local registry from them.
    ///
    /// Returns the identifiers in the order the cloud listed them.
    pub async fn sync_devices(&mut self) -> Result<Vec<String>> {
        let body = self
            .execute(&ApiRequest::get("/bindings?limit=20&skip=0"))
            .await?;
        check_api_error(&body)?;

        let listing: BindingsResponse = serde_json::from_value(body)
            .map_err(|e| Error::MalformedResponse(format!("device listing: {}", e)))?;

        let ids: Vec<String> = listing.devices.iter().map(|b| b.did.clone()).collect();
        let records = listing.devices.into_iter().map(DeviceRecord::from).collect();
        Registry::rebuild(self.session.config(), records)?;

        info!("Synchronised {} devices", ids.len());
        Ok(ids)
    }
}

fn check_api_error(body: &Value) -> Result<()> {
    match ErrorResponse::from_value(body) {
        Some(error) => Err(Error::Api(error.message())),
        None => Ok(()),
    }
}
