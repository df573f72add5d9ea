//! Runtime configuration read from the environment.
//!
//! `main` loads a `.env` file with `dotenvy` first, so every setting below can
//! live there during development.

use std::{net::SocketAddr, path::PathBuf};

use crate::error::{AppError, Result};
use crate::strike::DEFAULT_ENDPOINT;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://kaminari_merch.sqlite?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_IMAGE_DIR: &str = "static/images";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub strike_api_key: String,
    pub strike_endpoint: String,
    /// Mark the session cookie `Secure`; needs HTTPS in front of the server
    pub session_secure: bool,
    pub session_expiry_days: i64,
    /// Create the admin role and the two demo accounts on startup
    pub seed_demo_data: bool,
    /// Where product images uploaded through the admin panel are written
    pub image_dir: PathBuf,
    /// Mount the websocket endpoint and the socket-notifying webhook
    pub enable_sockets: bool,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is not a socket address: {e}")))?;

        let strike_api_key = get("STRIKE_API_KEY")
            .ok_or_else(|| AppError::Config("STRIKE_API_KEY must be set".to_string()))?;

        let session_expiry_days = match get("SESSION_EXPIRY_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "SESSION_EXPIRY_DAYS must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => 7,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr,
            strike_api_key,
            strike_endpoint: get("STRIKE_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            session_secure: parse_bool("SESSION_SECURE", get("SESSION_SECURE"), false)?,
            session_expiry_days,
            seed_demo_data: parse_bool("SEED_DEMO_DATA", get("SEED_DEMO_DATA"), true)?,
            image_dir: PathBuf::from(
                get("IMAGE_DIR").unwrap_or_else(|| DEFAULT_IMAGE_DIR.to_string()),
            ),
            enable_sockets: parse_bool("ENABLE_SOCKETS", get("ENABLE_SOCKETS"), true)?,
        })
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "{key} must be a boolean, got {raw:?}"
        ))),
    }
}
