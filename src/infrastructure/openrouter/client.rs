use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::domain::errors::ProviderError;
use crate::domain::models::ProviderConfig;
use crate::domain::ports::{AgentProvider, AgentRequest, ChunkSink};

use super::streaming::{SseChunkParser, SseEvent};
use super::types::{ChatMessage, ChatRequest, ChatResponse};

const JSON_INSTRUCTION: &str =
    "\n\nRespond with a single JSON object only, without prose or code fences.";

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::Unknown(format!("undecodable response: {err}"));
        }
        Self::Transient(err.to_string())
    }
}

/// Client for an OpenAI-compatible chat-completions endpoint such as OpenRouter.
pub struct OpenRouterClient {
    http: Client,
    config: ProviderConfig,
}

impl OpenRouterClient {
    /// Build a client. The API key falls back to `OPENROUTER_API_KEY`.
    pub fn new(mut config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            config.api_key = std::env::var("OPENROUTER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty());
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ProviderError::Unknown(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Authentication("no API key configured".to_string()))
    }

    async fn send(&self, request: &AgentRequest, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let api_key = self.api_key()?;
        let system = if request.json_mode {
            format!("{}{JSON_INSTRUCTION}", request.system_prompt)
        } else {
            request.system_prompt.clone()
        };
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: &system },
                ChatMessage { role: "user", content: &request.user_prompt },
            ],
            temperature: request.temperature.unwrap_or(self.config.temperature),
            stream,
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header("X-Title", "hypercycle")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), text));
        }
        Ok(response)
    }
}

#[async_trait]
impl AgentProvider for OpenRouterClient {
    #[instrument(skip_all, fields(role = %request.role, model = %self.config.model))]
    async fn invoke(&self, request: &AgentRequest) -> Result<String, ProviderError> {
        let response: ChatResponse = self.send(request, false).await?.json().await?;
        let text = response
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Unknown("response contained no message".to_string()))?;
        debug!(chars = text.len(), "completion received");
        Ok(text.trim().to_string())
    }

    #[instrument(skip_all, fields(role = %request.role, model = %self.config.model))]
    async fn invoke_streaming(
        &self,
        request: &AgentRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, ProviderError> {
        let mut stream = self.send(request, true).await?.bytes_stream();
        let mut parser = SseChunkParser::new();
        let mut text = String::new();

        'read: while let Some(chunk) = stream.next().await {
            for event in parser.feed(&chunk?) {
                match event {
                    SseEvent::Delta(delta) => {
                        text.push_str(&delta);
                        on_chunk(&delta, &text);
                    }
                    SseEvent::Done => break 'read,
                }
            }
        }
        if let Some(SseEvent::Delta(delta)) = parser.finish() {
            text.push_str(&delta);
            on_chunk(&delta, &text);
        }

        debug!(chars = text.len(), "stream complete");
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}
