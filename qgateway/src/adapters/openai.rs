//! OpenAI-compatible `chat/completions` SSE adapter.
//!
//! Speaks the widely-cloned streaming chat-completions wire format. Failures
//! before the response body starts are classified by status code and are
//! safe to retry; failures after the first body chunk surface as
//! `Interrupted` because fragments may already have been relayed.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::resilience::open_with_retry;
use crate::{
    BoxedFragmentStream, CompletionEvent, CompletionGateway, CompletionRequest,
    CompletionSummary, GatewayError, GatewayFuture, GatewayId, GatewayOperationHooks,
    GenerationUsage, NoopGatewayHooks, PromptMessage, RetryPolicy, Role, StopCause,
};

#[derive(Clone)]
pub struct OpenAiCompatGateway {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    hooks: Arc<dyn GatewayOperationHooks>,
}

impl OpenAiCompatGateway {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
            hooks: Arc::new(NoopGatewayHooks),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_operation_hooks(mut self, hooks: Arc<dyn GatewayOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn open_stream(&self, api_request: &ApiRequest) -> Result<Response, GatewayError> {
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(api_request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GatewayError::timeout(err.to_string())
                } else {
                    GatewayError::unavailable(err.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        Ok(response)
    }

    async fn parse_error(response: Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("completion request failed with status {status}"));

        classify_status(status, message)
    }
}

impl CompletionGateway for OpenAiCompatGateway {
    fn id(&self) -> GatewayId {
        GatewayId::OpenAiCompat
    }

    fn stream_completion<'a>(
        &'a self,
        request: CompletionRequest,
    ) -> GatewayFuture<'a, Result<BoxedFragmentStream<'a>, GatewayError>> {
        Box::pin(async move {
            request.validate()?;
            let api_request = build_api_request(request);

            // Retry covers opening only. Once the body starts, failures are
            // interrupted streams and flow through to the session layer.
            let response = {
                let api_request = &api_request;
                open_with_retry(
                    self.id(),
                    "stream_completion",
                    &self.retry,
                    self.hooks.as_ref(),
                    move || self.open_stream(api_request),
                )
                .await?
            };

            let stream = try_stream! {
                let mut chunks = response.bytes_stream();
                let mut sse_buffer = String::new();
                let mut finished = false;
                let mut usage = None::<GenerationUsage>;
                let mut stop = StopCause::Other;

                while let Some(item) = chunks.next().await {
                    let bytes =
                        item.map_err(|err| GatewayError::interrupted(err.to_string()))?;
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|err| GatewayError::interrupted(err.to_string()))?;
                    sse_buffer.push_str(text);

                    while let Some(newline_index) = sse_buffer.find('\n') {
                        let line = sse_buffer.drain(..=newline_index).collect::<String>();
                        let line = line.trim();

                        if !line.starts_with("data:") {
                            continue;
                        }

                        let payload = line.trim_start_matches("data:").trim();
                        if payload == "[DONE]" {
                            finished = true;
                            break;
                        }

                        let parsed: ApiStreamChunk = serde_json::from_str(payload)
                            .map_err(|err| GatewayError::interrupted(err.to_string()))?;

                        if let Some(chunk_usage) = parsed.usage {
                            usage = Some(GenerationUsage::new(chunk_usage.total_tokens));
                        }

                        if let Some(choice) = parsed.choices.first() {
                            if let Some(delta_content) = &choice.delta.content {
                                if !delta_content.is_empty() {
                                    yield CompletionEvent::Fragment(delta_content.clone());
                                }
                            }

                            if choice.finish_reason.is_some() {
                                stop = parse_stop_cause(choice.finish_reason.as_deref());
                            }
                        }
                    }

                    if finished {
                        break;
                    }
                }

                yield CompletionEvent::Completed(CompletionSummary::new(usage, stop));
            };

            Ok(Box::pin(stream) as BoxedFragmentStream<'a>)
        })
    }
}

fn classify_status(status: StatusCode, message: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            GatewayError::timeout(message)
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::invalid_request(message)
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            GatewayError::unavailable(message)
        }
        _ => GatewayError::transport(message),
    }
}

fn build_api_request(request: CompletionRequest) -> ApiRequest {
    let messages = request
        .messages
        .into_iter()
        .map(ApiMessage::from)
        .collect::<Vec<_>>();

    ApiRequest {
        model: request.model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        stream: true,
        // Without this the final chunk omits usage and billing falls back to
        // the configured default amount.
        stream_options: ApiStreamOptions {
            include_usage: true,
        },
    }
}

fn parse_stop_cause(value: Option<&str>) -> StopCause {
    match value {
        Some("stop") => StopCause::EndTurn,
        Some("length") => StopCause::MaxTokens,
        Some("cancelled") => StopCause::Cancelled,
        _ => StopCause::Other,
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    stream_options: ApiStreamOptions,
}

#[derive(Debug, Serialize)]
struct ApiStreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

impl From<PromptMessage> for ApiMessage {
    fn from(value: PromptMessage) -> Self {
        let role = match value.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        Self {
            role: role.to_string(),
            content: value.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiStreamChunk {
    #[serde(default)]
    choices: Vec<ApiStreamChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiStreamChoice {
    delta: ApiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
