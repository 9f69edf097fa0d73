//! Configuration loading from environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use charge_types::domain::card::{DEFAULT_MERCHANT_ACCOUNT, DEFAULT_ROUTING_NUMBER};

pub const DEFAULT_LEDGER_API_URL: &str = "http://ledgerwriter.bank-of-anthos.svc.cluster.local:8080";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub ledger_api_url: String,
    pub merchant_account: String,
    pub routing_number: String,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    pub token_expiry: Duration,
    /// 0 means the limiter default
    pub rate_limit_per_minute: u32,
    pub ledger_timeout: Duration,
    pub log_format: LogFormat,
    /// OTLP collector; span export is off when unset
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Unset and empty values take
    /// their defaults; a value that is present but unparseable is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("pretty") | Some("text") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be `pretty` or `json`, got `{other}`"),
        };

        Ok(Self {
            port: parse(&get, "PORT", 8080)?,
            ledger_api_url: get("LEDGER_API_URL")
                .unwrap_or_else(|| DEFAULT_LEDGER_API_URL.to_string()),
            merchant_account: get("MERCHANT_ACCOUNT")
                .unwrap_or_else(|| DEFAULT_MERCHANT_ACCOUNT.to_string()),
            routing_number: get("ROUTING_NUMBER")
                .unwrap_or_else(|| DEFAULT_ROUTING_NUMBER.to_string()),
            private_key_path: get("PRIV_KEY_PATH")
                .unwrap_or_else(|| "/tmp/.ssh/privatekey".to_string())
                .into(),
            public_key_path: get("PUB_KEY_PATH")
                .unwrap_or_else(|| "/tmp/.ssh/publickey".to_string())
                .into(),
            token_expiry: Duration::from_secs(parse(&get, "TOKEN_EXPIRY_SECONDS", 3600)?),
            rate_limit_per_minute: parse(&get, "RATE_LIMIT_PER_MINUTE", 10)?,
            ledger_timeout: Duration::from_secs(parse(&get, "LEDGER_TIMEOUT_SECONDS", 30)?),
            log_format,
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => Ok(default),
    }
}
