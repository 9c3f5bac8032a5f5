use std::{env, error::Error, time::Duration};

use crate::{clock::DEFAULT_TTL_SECONDS, replay::DEFAULT_REPLAY_TIMEOUT};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub webhook_expiry_seconds: i64,
    pub max_webhook_size_bytes: usize,
    pub replay_timeout: Duration,
}

const DEFAULT_PORT: &str = "8080";
const DEFAULT_MAX_WEBHOOK_SIZE_BYTES: usize = 5_242_880;

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => raw,
            Err(env::VarError::NotPresent) => {
                let port = match env::var("PORT") {
                    Ok(port) if !port.is_empty() => port,
                    Ok(_) | Err(env::VarError::NotPresent) => DEFAULT_PORT.to_owned(),
                    Err(err) => return Err(Box::new(err)),
                };
                format!("0.0.0.0:{port}")
            }
            Err(err) => return Err(Box::new(err)),
        };
        // An unusable expiry is ignored rather than fatal.
        let webhook_expiry_seconds = match env::var("WEBHOOK_EXPIRY_SECONDS") {
            Ok(raw) => match raw.trim().parse::<i64>() {
                Ok(seconds) if seconds > 0 => seconds,
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid WEBHOOK_EXPIRY_SECONDS");
                    DEFAULT_TTL_SECONDS
                }
            },
            Err(env::VarError::NotPresent) => DEFAULT_TTL_SECONDS,
            Err(err) => return Err(Box::new(err)),
        };
        let max_webhook_size_bytes = match env::var("MAX_WEBHOOK_SIZE_BYTES") {
            Ok(raw) => raw.parse::<usize>()?,
            Err(env::VarError::NotPresent) => DEFAULT_MAX_WEBHOOK_SIZE_BYTES,
            Err(err) => return Err(Box::new(err)),
        };
        let replay_timeout = match env::var("REPLAY_TIMEOUT_SECONDS") {
            Ok(raw) => match raw.parse::<u64>()? {
                0 => {
                    tracing::warn!(value = %raw, "ignoring zero REPLAY_TIMEOUT_SECONDS");
                    DEFAULT_REPLAY_TIMEOUT
                }
                seconds => Duration::from_secs(seconds),
            },
            Err(env::VarError::NotPresent) => DEFAULT_REPLAY_TIMEOUT,
            Err(err) => return Err(Box::new(err)),
        };

        Ok(Self {
            bind_addr,
            webhook_expiry_seconds,
            max_webhook_size_bytes,
            replay_timeout,
        })
    }
}
