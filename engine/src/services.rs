//! Wiring of the engine services into the handles the HTTP layer consumes

use crate::assistant::{BriefingService, Classifier, Executor};
use crate::config::Config;
use crate::db::Database;
use crate::llm::{LLMProvider, OpenAICompatibleProvider};
use crate::receipts::ReceiptService;
use crate::secrets::SecretCache;
use crate::speech::{ElevenLabsClient, WhisperClient};
use crate::team::TeamService;
use crate::travel::{TravelTimeService, TravelTimeSource};
use async_trait::async_trait;
use sdk::context::{
    AssistantHandle, AssistantHandleImpl, CoreContext, MediaHandle, MediaHandleImpl, TeamHandle,
    TeamHandleImpl, TravelHandle, TravelHandleImpl,
};
use sdk::errors::EngineError;
use sdk::types::{
    AvailabilityResponse, Briefing, ClassifyRequest, ClassifyResponse, ExecuteRequest,
    ExecuteResponse, ReceiptOutcome, TravelTimeRequest, TravelTimeResponse, TravelUsage, Upload,
};
use std::sync::Arc;
use tracing::info;

/// Classification, execution and briefings behind one handle
pub struct AssistantService {
    classifier: Classifier,
    executor: Executor,
    briefings: BriefingService,
}

impl AssistantService {
    pub fn new(classifier: Classifier, executor: Executor, briefings: BriefingService) -> Self {
        Self {
            classifier,
            executor,
            briefings,
        }
    }
}

#[async_trait]
impl AssistantHandleImpl for AssistantService {
    async fn classify(&self, request: ClassifyRequest) -> Result<ClassifyResponse, EngineError> {
        self.classifier
            .classify(request.text.as_deref(), request.previous_context.as_ref())
            .await
    }

    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, EngineError> {
        self.executor.execute(request).await
    }

    async fn list(&self, category: Option<String>) -> Result<serde_json::Value, EngineError> {
        self.executor.list(category.as_deref()).await
    }

    async fn briefing(&self, user_id: Option<String>) -> Result<Briefing, EngineError> {
        self.briefings.briefing(user_id).await
    }
}

#[async_trait]
impl TravelHandleImpl for TravelTimeService {
    async fn estimate(
        &self,
        request: TravelTimeRequest,
    ) -> Result<TravelTimeResponse, EngineError> {
        TravelTimeService::estimate(self, request).await
    }

    fn usage(&self) -> TravelUsage {
        TravelTimeService::usage(self)
    }
}

/// Speech in, speech out and receipt vision
pub struct MediaService {
    whisper: WhisperClient,
    voice: ElevenLabsClient,
    receipts: ReceiptService,
}

impl MediaService {
    pub fn new(whisper: WhisperClient, voice: ElevenLabsClient, receipts: ReceiptService) -> Self {
        Self {
            whisper,
            voice,
            receipts,
        }
    }
}

#[async_trait]
impl MediaHandleImpl for MediaService {
    async fn transcribe(&self, audio: Upload) -> Result<String, EngineError> {
        self.whisper.transcribe(audio).await
    }

    async fn speak(&self, text: String) -> Result<Vec<u8>, EngineError> {
        self.voice.speak(&text).await
    }

    async fn analyze_receipt(
        &self,
        image: Upload,
        save: bool,
    ) -> Result<ReceiptOutcome, EngineError> {
        self.receipts.analyze(image, save).await
    }
}

#[async_trait]
impl TeamHandleImpl for TeamService {
    async fn availability(
        &self,
        user_ids: Vec<String>,
        date: Option<String>,
    ) -> Result<AvailabilityResponse, EngineError> {
        TeamService::availability(self, user_ids, date).await
    }
}

/// Build the [`CoreContext`] using the configured OpenAI-compatible provider
pub fn build_context(config: &Config, db: Database, secrets: Arc<SecretCache>) -> CoreContext {
    let provider: Arc<dyn LLMProvider> = Arc::new(OpenAICompatibleProvider::new(
        config.llm.clone(),
        secrets.clone(),
    ));
    build_context_with_provider(config, db, secrets, provider)
}

/// Build the [`CoreContext`] around an explicit language model
pub fn build_context_with_provider(
    config: &Config,
    db: Database,
    secrets: Arc<SecretCache>,
    provider: Arc<dyn LLMProvider>,
) -> CoreContext {
    let travel = Arc::new(TravelTimeService::new(
        config.travel.clone(),
        secrets.clone(),
    ));
    let travel_source: Arc<dyn TravelTimeSource> = travel.clone();

    let assistant = AssistantService::new(
        Classifier::new(provider.clone(), config.llm.classify_temperature),
        Executor::new(db.clone(), travel_source, config.user.clone()),
        BriefingService::new(
            db.clone(),
            provider.clone(),
            config.llm.briefing_temperature,
            config.user.default_id.clone(),
        ),
    );

    let media = MediaService::new(
        WhisperClient::new(&config.speech, secrets.clone()),
        ElevenLabsClient::new(config.speech.clone(), secrets),
        ReceiptService::new(
            provider.clone(),
            config.llm.vision_model.clone(),
            config.llm.vision_temperature,
            db.clone(),
            config.user.clone(),
        ),
    );

    info!(
        "Engine services ready (provider: {}, travel quota: {}/month)",
        provider.name(),
        config.travel.monthly_quota
    );

    CoreContext::new(
        AssistantHandle::new(Arc::new(assistant)),
        TravelHandle::new(travel),
        MediaHandle::new(Arc::new(media)),
        TeamHandle::new(Arc::new(TeamService::new(db))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedProvider;
    use sdk::types::{Classification, TravelMode};
    use serde_json::json;

    async fn context(answer: &str) -> (tempfile::TempDir, CoreContext) {
        let config = Config::default();
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("test.db")).await.unwrap();
        let provider = Arc::new(ScriptedProvider::answering(answer));
        let ctx = build_context_with_provider(
            &config,
            db,
            Arc::new(SecretCache::from_values(Vec::<(String, String)>::new())),
            provider,
        );
        (dir, ctx)
    }

    #[tokio::test]
    async fn test_classify_through_handle() {
        let (_dir, ctx) =
            context(r#"{"category":"notes","action":"create","data":{"title":"Idea"}}"#).await;
        let out = ctx
            .assistant
            .classify(ClassifyRequest {
                text: Some("note: idea".into()),
                previous_context: None,
            })
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.classification.category, "notes");
    }

    #[tokio::test]
    async fn test_execute_then_list_through_handle() {
        let (_dir, ctx) = context("{}").await;
        ctx.assistant
            .execute(ExecuteRequest {
                classification: Some(Classification::new(
                    "shopping",
                    "add",
                    json!({"items": ["Milk"]}),
                )),
                force: false,
            })
            .await
            .unwrap();

        let listed = ctx.assistant.list(Some("shopping".into())).await.unwrap();
        assert_eq!(listed["items"].as_array().map(Vec::len), Some(1));
        assert_eq!(listed["items"][0]["name"], "Milk");
    }

    #[tokio::test]
    async fn test_travel_usage_starts_full() {
        let (_dir, ctx) = context("{}").await;
        let usage = ctx.travel.usage();
        assert_eq!(usage.api_calls_used, 0);
        assert_eq!(usage.api_calls_remaining, Config::default().travel.monthly_quota);

        let missing = ctx
            .travel
            .estimate(TravelTimeRequest {
                from: None,
                to: Some("Office".into()),
                mode: Some(TravelMode::Walking),
            })
            .await
            .unwrap_err();
        assert_eq!(missing.to_string(), "Missing from or to location");
    }

    #[tokio::test]
    async fn test_media_rejects_empty_uploads() {
        let (_dir, ctx) = context("{}").await;
        let err = ctx.media.transcribe(Upload::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "No audio file provided");
        let err = ctx.media.speak(String::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "No text provided");
    }
}
