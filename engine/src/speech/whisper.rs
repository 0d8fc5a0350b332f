use super::{http_client, OPENAI_API_KEY};
use crate::config::SpeechConfig;
use crate::secrets::{SecretCache, SecretManager};
use reqwest::multipart::{Form, Part};
use sdk::errors::EngineError;
use sdk::types::Upload;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

/// OpenAI Whisper transcription client
pub struct WhisperClient {
    base_url: String,
    model: String,
    language: String,
    secrets: Arc<SecretCache>,
    client: reqwest::Client,
}

impl WhisperClient {
    pub fn new(config: &SpeechConfig, secrets: Arc<SecretCache>) -> Self {
        Self {
            base_url: config.whisper_base_url.clone(),
            model: config.whisper_model.clone(),
            language: config.language.clone(),
            secrets,
            client: http_client(),
        }
    }

    pub async fn transcribe(&self, audio: Upload) -> Result<String, EngineError> {
        if audio.bytes.is_empty() {
            return Err(EngineError::InvalidRequest(
                "No audio file provided".to_string(),
            ));
        }

        let api_key = self.secrets.get_secret(OPENAI_API_KEY)?;
        let size = audio.bytes.len();

        let file_name = audio
            .file_name
            .clone()
            .unwrap_or_else(|| "audio.webm".to_string());
        let mut part = Part::bytes(audio.bytes).file_name(file_name);
        if let Some(content_type) = audio.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| EngineError::InvalidRequest(format!("Invalid content type: {}", e)))?;
        }

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());

        debug!("Sending {} bytes of audio for transcription", size);

        let response = self
            .client
            .post(format!(
                "{}/audio/transcriptions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(api_key.unsecure())
            .multipart(form)
            .send()
            .await
            .map_err(|e| EngineError::Network(SecretManager::scrub(&e.to_string())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = SecretManager::scrub(&response.text().await.unwrap_or_default());
            warn!("Whisper API error ({}): {}", status, body);
            return Err(EngineError::upstream("Transcription", status.to_string()));
        }

        let transcription: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::upstream("Transcription", e.to_string()))?;

        Ok(transcription.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> WhisperClient {
        let config = SpeechConfig {
            whisper_base_url: base_url.to_string(),
            ..SpeechConfig::default()
        };
        WhisperClient::new(
            &config,
            Arc::new(SecretCache::from_values([(OPENAI_API_KEY, "sk-test")])),
        )
    }

    #[tokio::test]
    async fn test_transcribe() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "Milch kaufen"})))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server.uri())
            .transcribe(Upload::new(vec![1, 2, 3]).with_content_type("audio/webm"))
            .await
            .unwrap();
        assert_eq!(text, "Milch kaufen");
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .transcribe(Upload::new(vec![1]))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Transcription request failed"));
    }

    #[tokio::test]
    async fn test_empty_audio_rejected() {
        let err = client("http://127.0.0.1:9")
            .transcribe(Upload::new(Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No audio file provided");
    }
}
