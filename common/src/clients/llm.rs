use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client,
};
use tokio_retry::{strategy::{jitter, FixedInterval}, Retry};
use tracing::warn;

use crate::error::AppError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Prompt-to-text completion client. One retry on transport error, a hard
/// per-call timeout, and a cheap health probe for auto-fallback decisions.
/// Returns raw text; parsing structured output is the caller's concern.
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model: String,
    timeout: Duration,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CompletionParams {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout: Option<Duration>,
}

impl LlmClient {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self {
            client,
            model,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn complete(&self, prompt: &str, params: CompletionParams) -> Result<String, AppError> {
        let strategy = FixedInterval::from_millis(250).map(jitter).take(1);

        let result = Retry::spawn(strategy, || self.complete_once(prompt, &params)).await;

        match result {
            Ok(text) => Ok(text),
            Err(err) => {
                warn!(error = %err, "LLM completion failed after retry");
                Err(err)
            }
        }
    }

    async fn complete_once(&self, prompt: &str, params: &CompletionParams) -> Result<String, AppError> {
        let call_timeout = params.timeout.unwrap_or(self.timeout);

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(vec![message.into()]);
        if let Some(temperature) = params.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = params.max_tokens {
            builder.max_tokens(max_tokens);
        }
        let request = builder.build()?;

        let response = tokio::time::timeout(call_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| AppError::AgentTimeout("LLM completion exceeded call timeout".into()))??;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::LLMParsing("LLM response had no message content".into()))
    }

    /// Cheap health probe: a single short-timeout completion against a
    /// trivial prompt. Used to drive `service_mode: auto` fallback.
    pub async fn is_available(&self) -> bool {
        let probe = CompletionParams {
            temperature: Some(0.0),
            max_tokens: Some(1),
            timeout: Some(Duration::from_secs(3)),
        };
        self.complete("ping", probe).await.is_ok()
    }
}
