pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod state;
pub mod types;

pub use client::HeatzyClient;
pub use config::{ConfigFile, Credentials, DeviceRecord, Registry};
pub use error::{Error, Result};
pub use state::{DeviceState, HeatingState, Product};
