//! Mibu Engine Library
//!
//! Everything behind the `mibu` binary and the HTTP API: configuration,
//! persistence, the language-model pipeline and the external services.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Database persistence module
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// Classification, execution and briefings
pub mod assistant;

/// Travel-time lookups with a cache and monthly quota
pub mod travel;

/// Whisper transcription and ElevenLabs speech
pub mod speech;

/// Receipt photo analysis
pub mod receipts;

/// Team availability
pub mod team;

/// Handle implementations behind the API server
pub mod services;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
