use super::{http_client, ELEVENLABS_API_KEY};
use crate::config::SpeechConfig;
use crate::secrets::{SecretCache, SecretManager};
use sdk::errors::EngineError;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// ElevenLabs text-to-speech client
pub struct ElevenLabsClient {
    config: SpeechConfig,
    secrets: Arc<SecretCache>,
    client: reqwest::Client,
}

impl ElevenLabsClient {
    pub fn new(config: SpeechConfig, secrets: Arc<SecretCache>) -> Self {
        Self {
            config,
            secrets,
            client: http_client(),
        }
    }

    /// Synthesize `text`, returning `audio/mpeg` bytes
    pub async fn speak(&self, text: &str) -> Result<Vec<u8>, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::InvalidRequest("No text provided".to_string()));
        }

        let api_key = self.secrets.get_secret(ELEVENLABS_API_KEY)?;
        let url = format!(
            "{}/text-to-speech/{}",
            self.config.elevenlabs_base_url.trim_end_matches('/'),
            self.config.voice_id
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key.unsecure())
            .header("Accept", "audio/mpeg")
            .json(&json!({
                "text": text,
                "model_id": self.config.voice_model,
                "voice_settings": {
                    "stability": self.config.stability,
                    "similarity_boost": self.config.similarity_boost,
                }
            }))
            .send()
            .await
            .map_err(|e| EngineError::Network(SecretManager::scrub(&e.to_string())))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = SecretManager::scrub(&response.text().await.unwrap_or_default());
            warn!("ElevenLabs API error ({}): {}", status, body);
            return Err(EngineError::upstream("ElevenLabs API", status.to_string()));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str, key: Option<&str>) -> ElevenLabsClient {
        let config = SpeechConfig {
            elevenlabs_base_url: base_url.to_string(),
            ..SpeechConfig::default()
        };
        let secrets = match key {
            Some(k) => SecretCache::from_values([(ELEVENLABS_API_KEY, k)]),
            None => SecretCache::from_values(Vec::<(String, String)>::new()),
        };
        ElevenLabsClient::new(config, Arc::new(secrets))
    }

    #[tokio::test]
    async fn test_speak_sends_voice_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/text-to-speech/pNInz6obpgDQGcFmaJgB"))
            .and(header("xi-api-key", "el-key"))
            .and(body_partial_json(json!({
                "text": "Hallo",
                "model_id": "eleven_monolingual_v1",
                "voice_settings": {"stability": 0.5, "similarity_boost": 0.75}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0xFF, 0xFB, 0x90]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let audio = client(&server.uri(), Some("el-key")).speak("Hallo").await.unwrap();
        assert_eq!(audio, vec![0xFF, 0xFB, 0x90]);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let err = client("http://127.0.0.1:9", None)
            .speak("Hallo")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "ELEVENLABS_API_KEY not configured");
    }

    #[tokio::test]
    async fn test_empty_text() {
        let err = client("http://127.0.0.1:9", Some("k"))
            .speak("  ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No text provided");
    }
}
