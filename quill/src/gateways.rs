//! Stable gateway construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::{CompletionGateway, GatewayError, OpenAiCompatGateway, RetryPolicy};

#[derive(Debug, Clone)]
pub struct GatewayBuildConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl GatewayBuildConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            timeout: Duration::from_secs(90),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

pub fn build_gateway_from_api_key(
    api_key: impl Into<String>,
) -> Result<Arc<dyn CompletionGateway>, GatewayError> {
    build_gateway_with_config(GatewayBuildConfig::new(api_key))
}

pub fn build_gateway_with_config(
    config: GatewayBuildConfig,
) -> Result<Arc<dyn CompletionGateway>, GatewayError> {
    let api_key = config.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(GatewayError::authentication(
            "gateway API key must not be empty",
        ));
    }

    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|error| GatewayError::transport(error.to_string()))?;

    let mut gateway = OpenAiCompatGateway::new(http, api_key).with_retry_policy(config.retry);
    if let Some(base_url) = config.base_url {
        gateway = gateway.with_base_url(base_url);
    }

    Ok(Arc::new(gateway))
}
