//! External reasoning provider port.

use async_trait::async_trait;

use crate::domain::errors::ProviderError;
use crate::domain::models::Role;

/// One call to the reasoning provider on behalf of a role.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    /// Role making the call.
    pub role: Role,
    /// Role instructions.
    pub system_prompt: String,
    /// Task for this call.
    pub user_prompt: String,
    /// Provider default when `None`
    pub temperature: Option<f32>,
    /// Ask for a bare JSON object as the answer
    pub json_mode: bool,
}

impl AgentRequest {
    /// Request with provider defaults.
    pub fn new(role: Role, system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            role,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: None,
            json_mode: false,
        }
    }

    /// Override the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Ask for a JSON object answer.
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Callback receiving each streamed delta together with the text accumulated so far.
pub type ChunkSink<'a> = &'a (dyn Fn(&str, &str) + Send + Sync);

/// Text-in, text-out reasoning provider.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Complete a request and return the full response text.
    async fn invoke(&self, request: &AgentRequest) -> Result<String, ProviderError>;

    /// Complete a request, reporting partial text as it arrives.
    ///
    /// Providers without streaming support deliver the whole answer as a single chunk.
    async fn invoke_streaming(
        &self,
        request: &AgentRequest,
        on_chunk: ChunkSink<'_>,
    ) -> Result<String, ProviderError> {
        let text = self.invoke(request).await?;
        on_chunk(&text, &text);
        Ok(text)
    }

    /// Provider name for logs
    fn name(&self) -> &'static str;
}
