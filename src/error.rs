use std::path::PathBuf;

use thiserror::Error;

use crate::state::Product;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),
    #[error("Login and password are required. Provide them via --login/--password or run 'heatzy login'.")]
    CredentialsMissing,
    #[error("No application id (appid=) in the configuration file")]
    AppIdMissing,
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
    #[error("Unknown state: {0} (expected one of off, comfort, eco, freeze)")]
    UnknownState(String),
    #[error("Unsupported product: {0}")]
    UnsupportedProduct(String),
    #[error("Unknown {product} mode: {token}")]
    UnknownWireToken { product: Product, token: String },
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
