//! Shared setup for the integration tests: a temp database and a config whose
//! upstream base URLs all point at one wiremock server.

#![allow(dead_code)]

use mibu_engine::config::Config;
use mibu_engine::db::Database;
use mibu_engine::secrets::SecretCache;
use mibu_engine::services::build_context;
use sdk::CoreContext;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::MockServer;

pub struct Harness {
    pub _dir: TempDir,
    pub config: Config,
    pub db: Database,
    pub ctx: CoreContext,
}

pub fn config_for(server: &MockServer, dir: &TempDir, monthly_quota: u32) -> Config {
    let toml = format!(
        r#"
[core]
log_level = "debug"
data_dir = "{data_dir}"
database_file = "mibu-test.db"

[llm]
base_url = "{base}/v1"
model = "grok-test"
vision_model = "grok-vision-test"

[speech]
whisper_base_url = "{base}/v1"
elevenlabs_base_url = "{base}/eleven"
voice_id = "voice-1"

[travel]
base_url = "{base}"
monthly_quota = {monthly_quota}
"#,
        data_dir = dir.path().display().to_string().replace('\\', "/"),
        base = server.uri(),
        monthly_quota = monthly_quota,
    );
    Config::from_toml_str(&toml).unwrap()
}

pub fn all_keys() -> Arc<SecretCache> {
    Arc::new(SecretCache::from_values([
        ("GROK_API_KEY", "xai-test"),
        ("OPENAI_API_KEY", "sk-test"),
        ("ELEVENLABS_API_KEY", "el-test"),
        ("SERPAPI_KEY", "serp-test"),
    ]))
}

pub async fn harness(server: &MockServer, monthly_quota: u32) -> Harness {
    let dir = TempDir::new().unwrap();
    let config = config_for(server, &dir, monthly_quota);
    let db = Database::new(&config.database_path()).await.unwrap();
    let ctx = build_context(&config, db.clone(), all_keys());
    Harness {
        _dir: dir,
        config,
        db,
        ctx,
    }
}

/// Body of an OpenAI-style chat completion answering `content`
pub fn chat_answer(content: &str) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}
