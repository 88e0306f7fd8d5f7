use crate::application::task_store::RetryPolicy;
use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

const APP_JSON: &str = "app.json";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 10;
const API_BASE_URL_KEYS: [&str; 2] = ["FOCUSDESK_API_BASE_URL", "API_BASE_URL"];
const REQUEST_TIMEOUT_KEYS: [&str; 1] = ["FOCUSDESK_REQUEST_TIMEOUT_SECONDS"];

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub schema: u8,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "FocusDesk",
        "apiBaseUrl": DEFAULT_API_BASE_URL,
        "requestTimeoutSeconds": DEFAULT_REQUEST_TIMEOUT_SECONDS,
        "retry": {
            "maxAttempts": 3,
            "baseDelayMs": 200
        }
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let header: ConfigFile = serde_json::from_value(parsed.clone()).map_err(|_| {
        InfraError::InvalidConfig(format!("missing schema in {}", path.display()))
    })?;
    if header.schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            header.schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    load_app_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

pub fn load_app_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<AppConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_dir.join(APP_JSON);
    let app = read_config(&path)?;

    let app_name = app
        .get("appName")
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("FocusDesk")
        .to_string();

    let raw_base_url = optional_lookup_value(&lookup, &API_BASE_URL_KEYS).unwrap_or_else(|| {
        app.get("apiBaseUrl")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_API_BASE_URL)
            .to_string()
    });
    let api_base_url = parse_base_url(&raw_base_url)?;

    let request_timeout_seconds = match optional_lookup_value(&lookup, &REQUEST_TIMEOUT_KEYS) {
        Some(raw) => raw.parse::<u64>().map_err(|error| {
            InfraError::InvalidConfig(format!(
                "{} must be a whole number of seconds: {error}",
                REQUEST_TIMEOUT_KEYS[0]
            ))
        })?,
        None => app
            .get("requestTimeoutSeconds")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS),
    };

    let mut retry_policy = RetryPolicy::default();
    if let Some(retry) = app.get("retry") {
        if let Some(value) = retry.get("maxAttempts").and_then(serde_json::Value::as_u64) {
            retry_policy.max_attempts = value.clamp(1, u64::from(u8::MAX)) as u8;
        }
        if let Some(value) = retry.get("baseDelayMs").and_then(serde_json::Value::as_u64) {
            retry_policy.base_delay_ms = value;
        }
    }

    Ok(AppConfig {
        app_name,
        api_base_url,
        request_timeout: Duration::from_secs(request_timeout_seconds.max(1)),
        retry_policy,
    })
}

fn parse_base_url(raw: &str) -> Result<Url, InfraError> {
    let url = Url::parse(raw)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid apiBaseUrl '{raw}': {error}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InfraError::InvalidConfig(format!(
            "apiBaseUrl must use http or https: {raw}"
        )));
    }
    Ok(url)
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in keys {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
