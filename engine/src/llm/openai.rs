use super::{CompletionOptions, LLMError, LLMProvider, Message};
use crate::config::LLMConfig;
use crate::secrets::{SecretCache, SecretManager};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Chat completions client for any OpenAI-compatible endpoint (xAI by default)
pub struct OpenAICompatibleProvider {
    config: LLMConfig,
    secret_cache: Arc<SecretCache>,
    client: reqwest::Client,
}

impl OpenAICompatibleProvider {
    pub fn new(config: LLMConfig, secret_cache: Arc<SecretCache>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            config,
            secret_cache,
            client,
        }
    }

    fn message_to_json(msg: &Message) -> Value {
        match &msg.image_url {
            Some(url) => json!({
                "role": msg.role.to_string(),
                "content": [
                    { "type": "text", "text": msg.content },
                    { "type": "image_url", "image_url": { "url": url } }
                ]
            }),
            None => json!({
                "role": msg.role.to_string(),
                "content": msg.content
            }),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn is_configured(&self) -> bool {
        self.secret_cache.has_secret(&self.config.api_key_name)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> super::Result<String> {
        let api_key = self
            .secret_cache
            .get_secret(&self.config.api_key_name)
            .map_err(|_| LLMError::NotConfigured(self.config.api_key_name.clone()))?;

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let model = options.model.as_deref().unwrap_or(&self.config.model);

        let payload = json!({
            "model": model,
            "messages": messages.iter().map(Self::message_to_json).collect::<Vec<_>>(),
            "temperature": options.temperature,
        });

        tracing::debug!(model, messages = messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(SecretManager::scrub(&e.to_string()))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = SecretManager::scrub(&response.text().await.unwrap_or_default());
            tracing::warn!(status = status.as_u16(), "Chat completion failed: {}", text);

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::AuthenticationFailed(text));
            } else if status.as_u16() == 429 {
                return Err(LLMError::RateLimitExceeded);
            } else {
                return Err(LLMError::InvalidRequest(format!("{}: {}", status, text)));
            }
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(base_url: &str, key: Option<&str>) -> OpenAICompatibleProvider {
        let config = LLMConfig {
            base_url: base_url.to_string(),
            api_key_name: "MIBU_TEST_LLM_KEY".to_string(),
            ..LLMConfig::default()
        };
        let cache = match key {
            Some(k) => SecretCache::from_values([("MIBU_TEST_LLM_KEY", k)]),
            None => SecretCache::from_values(Vec::<(String, String)>::new()),
        };
        OpenAICompatibleProvider::new(config, Arc::new(cache))
    }

    #[tokio::test]
    async fn test_complete_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "grok-4-latest", "temperature": 0.3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "hello"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let p = provider(&server.uri(), Some("test-key"));
        let out = p
            .complete(&[Message::user("hi")], &CompletionOptions::with_temperature(0.3))
            .await
            .unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_image_message_uses_content_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": "grok-2-vision-1212",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "read"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AA=="}}
                    ]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "{}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let p = provider(&server.uri(), Some("k"));
        let opts = CompletionOptions::with_temperature(0.1).model("grok-2-vision-1212");
        p.complete(
            &[Message::user_with_image("read", "data:image/png;base64,AA==")],
            &opts,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let p = provider(&server.uri(), Some("k"));
        let err = p
            .complete(&[Message::user("hi")], &CompletionOptions::with_temperature(0.3))
            .await
            .unwrap_err();
        assert!(matches!(err, LLMError::RateLimitExceeded));
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let p = provider(&server.uri(), None);
        assert!(!p.is_configured());
        let err = p
            .complete(&[Message::user("hi")], &CompletionOptions::with_temperature(0.3))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "MIBU_TEST_LLM_KEY not configured");
    }
}
