//! OpenAI client configuration with sensible defaults.

use crate::config::ModelSettings;
use crate::error::{MuseError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout and endpoint.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_with(&ModelSettings {
        timeout_seconds: DEFAULT_TIMEOUT_SECS,
        ..ModelSettings::default()
    })
}

/// Create an OpenAI client for the configured endpoint and timeout.
///
/// The API key is read from `OPENAI_API_KEY`.
pub fn create_client_with(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let http_client = http_client(Duration::from_secs(settings.timeout_seconds))?;
    let config = OpenAIConfig::default().with_api_base(settings.api_base.trim_end_matches('/'));
    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Build a reqwest client with the given request timeout.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MuseError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Read the provider API key from the environment.
pub fn api_key() -> Result<String> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(MuseError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        )),
    }
}
