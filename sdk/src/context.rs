//! Core context and handle types
//!
//! `CoreContext` is the only API surface the HTTP layer uses to reach the
//! engine. Each handle wraps an engine-provided implementation behind a trait
//! object, so the server can be tested against fakes and the engine can change
//! its internals without touching the routes.

use crate::errors::EngineError;
use crate::types::{
    AvailabilityResponse, Briefing, ClassifyRequest, ClassifyResponse, ExecuteRequest,
    ExecuteResponse, ReceiptOutcome, TravelTimeRequest, TravelTimeResponse, TravelUsage, Upload,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Context handed to the API server
#[derive(Clone)]
pub struct CoreContext {
    /// Classification, execution, listing and briefings
    pub assistant: AssistantHandle,

    /// Travel-time lookups and quota usage
    pub travel: TravelHandle,

    /// Speech-to-text, text-to-speech and receipt vision
    pub media: MediaHandle,

    /// Shared team availability
    pub team: TeamHandle,
}

impl CoreContext {
    pub fn new(
        assistant: AssistantHandle,
        travel: TravelHandle,
        media: MediaHandle,
        team: TeamHandle,
    ) -> Self {
        Self {
            assistant,
            travel,
            media,
            team,
        }
    }
}

/// Handle for the command pipeline
#[derive(Clone)]
pub struct AssistantHandle {
    inner: Arc<dyn AssistantHandleImpl>,
}

impl AssistantHandle {
    pub fn new(inner: Arc<dyn AssistantHandleImpl>) -> Self {
        Self { inner }
    }

    /// Classify free-form text into a structured intent
    pub async fn classify(&self, request: ClassifyRequest) -> Result<ClassifyResponse, EngineError> {
        self.inner.classify(request).await
    }

    /// Execute a classification against the record domains
    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, EngineError> {
        self.inner.execute(request).await
    }

    /// List the default user's records for one category
    pub async fn list(&self, category: Option<String>) -> Result<serde_json::Value, EngineError> {
        self.inner.list(category).await
    }

    /// Build today's briefing for a user
    pub async fn briefing(&self, user_id: Option<String>) -> Result<Briefing, EngineError> {
        self.inner.briefing(user_id).await
    }
}

/// Trait for assistant handle implementation (to be implemented by engine)
#[async_trait]
pub trait AssistantHandleImpl: Send + Sync {
    async fn classify(&self, request: ClassifyRequest) -> Result<ClassifyResponse, EngineError>;

    async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, EngineError>;

    async fn list(&self, category: Option<String>) -> Result<serde_json::Value, EngineError>;

    async fn briefing(&self, user_id: Option<String>) -> Result<Briefing, EngineError>;
}

/// Handle for travel-time lookups
#[derive(Clone)]
pub struct TravelHandle {
    inner: Arc<dyn TravelHandleImpl>,
}

impl TravelHandle {
    pub fn new(inner: Arc<dyn TravelHandleImpl>) -> Self {
        Self { inner }
    }

    pub async fn estimate(
        &self,
        request: TravelTimeRequest,
    ) -> Result<TravelTimeResponse, EngineError> {
        self.inner.estimate(request).await
    }

    pub fn usage(&self) -> TravelUsage {
        self.inner.usage()
    }
}

/// Trait for travel handle implementation (to be implemented by engine)
#[async_trait]
pub trait TravelHandleImpl: Send + Sync {
    async fn estimate(&self, request: TravelTimeRequest)
        -> Result<TravelTimeResponse, EngineError>;

    fn usage(&self) -> TravelUsage;
}

/// Handle for audio and image processing
#[derive(Clone)]
pub struct MediaHandle {
    inner: Arc<dyn MediaHandleImpl>,
}

impl MediaHandle {
    pub fn new(inner: Arc<dyn MediaHandleImpl>) -> Self {
        Self { inner }
    }

    /// Transcribe an audio upload to text
    pub async fn transcribe(&self, audio: Upload) -> Result<String, EngineError> {
        self.inner.transcribe(audio).await
    }

    /// Synthesize speech, returning MPEG audio bytes
    pub async fn speak(&self, text: String) -> Result<Vec<u8>, EngineError> {
        self.inner.speak(text).await
    }

    /// Extract receipt fields from an image, optionally saving a transaction
    pub async fn analyze_receipt(
        &self,
        image: Upload,
        save: bool,
    ) -> Result<ReceiptOutcome, EngineError> {
        self.inner.analyze_receipt(image, save).await
    }
}

/// Trait for media handle implementation (to be implemented by engine)
#[async_trait]
pub trait MediaHandleImpl: Send + Sync {
    async fn transcribe(&self, audio: Upload) -> Result<String, EngineError>;

    async fn speak(&self, text: String) -> Result<Vec<u8>, EngineError>;

    async fn analyze_receipt(&self, image: Upload, save: bool)
        -> Result<ReceiptOutcome, EngineError>;
}

/// Handle for team scheduling
#[derive(Clone)]
pub struct TeamHandle {
    inner: Arc<dyn TeamHandleImpl>,
}

impl TeamHandle {
    pub fn new(inner: Arc<dyn TeamHandleImpl>) -> Self {
        Self { inner }
    }

    pub async fn availability(
        &self,
        user_ids: Vec<String>,
        date: Option<String>,
    ) -> Result<AvailabilityResponse, EngineError> {
        self.inner.availability(user_ids, date).await
    }
}

/// Trait for team handle implementation (to be implemented by engine)
#[async_trait]
pub trait TeamHandleImpl: Send + Sync {
    async fn availability(
        &self,
        user_ids: Vec<String>,
        date: Option<String>,
    ) -> Result<AvailabilityResponse, EngineError>;
}
