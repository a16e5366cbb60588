//! OpenAI-compatible chat completion providers.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;

/// A completion endpoint that turns a system prompt and a user message into text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Name used in logs and diagnostic notes.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, InvocationError>;
}

/// Call `provider` once and return the trimmed completion.
///
/// A blank completion counts as a failure so the caller falls through to the
/// next stage instead of replying with nothing.
pub async fn invoke(
    provider: &dyn CompletionProvider,
    model: &str,
    system_prompt: &str,
    user_message: &str,
) -> Result<String, InvocationError> {
    let text = provider.complete(model, system_prompt, user_message).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(InvocationError::Empty);
    }
    Ok(text.to_string())
}

pub struct OpenAiCompatible {
    label: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatible {
    /// Build a client whose requests give up after `timeout`, so a stalled
    /// endpoint fails like any other error and the next stage gets its turn.
    pub fn new(
        label: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InvocationError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InvocationError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            label: label.into(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, InvocationError> {
        Self::new(config.label, config.api_key.clone(), config.base_url.clone(), config.timeout)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatible {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, InvocationError> {
        let request = ApiRequest {
            model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system_prompt.trim(),
                },
                ApiMessage {
                    role: "user",
                    content: user_message,
                },
            ],
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| InvocationError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(InvocationError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| InvocationError::Parse(e.to_string()))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(InvocationError::Empty)
    }
}

#[derive(Debug)]
pub enum InvocationError {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for InvocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationError::Http(e) => write!(f, "HTTP error: {e}"),
            InvocationError::Api(e) => write!(f, "API error: {e}"),
            InvocationError::Parse(e) => write!(f, "Parse error: {e}"),
            InvocationError::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for InvocationError {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl CompletionProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _: &str, _: &str, _: &str) -> Result<String, InvocationError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_invoke_trims() {
        let text = invoke(&Fixed("  Registration opens March 1.\n"), "m", "sys", "q").await.unwrap();
        assert_eq!(text, "Registration opens March 1.");
    }

    #[tokio::test]
    async fn test_invoke_blank_is_error() {
        let err = invoke(&Fixed(" \n "), "m", "sys", "q").await.unwrap_err();
        assert!(matches!(err, InvocationError::Empty));
    }

    #[test]
    fn test_request_shape() {
        let request = ApiRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ApiMessage { role: "system", content: "be brief" },
                ApiMessage { role: "user", content: "hi" },
            ],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider =
            OpenAiCompatible::new("Groq", "key", "https://api.groq.com/openai/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(provider.name(), "Groq");
    }
}
