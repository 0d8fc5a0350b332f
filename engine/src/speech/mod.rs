//! Speech-to-text and text-to-speech proxies

pub mod elevenlabs;
pub mod whisper;

pub use elevenlabs::ElevenLabsClient;
pub use whisper::WhisperClient;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ELEVENLABS_API_KEY: &str = "ELEVENLABS_API_KEY";

use std::time::Duration;

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap_or_default()
}
