//! Mibu SDK
//!
//! Shared library providing the wire types, error taxonomy and context
//! handles used by both the engine and the API server.

/// Core context and engine handles
pub mod context;

/// Error types and handling
pub mod errors;

/// Wire types shared with the browser client
pub mod types;

// Re-export commonly used types
pub use context::{
    AssistantHandle, AssistantHandleImpl, CoreContext, MediaHandle, MediaHandleImpl, TeamHandle,
    TeamHandleImpl, TravelHandle, TravelHandleImpl,
};
pub use errors::{EngineError, MibuErrorExt};
pub use types::{
    AvailabilityRequest, AvailabilityResponse, Briefing, BriefingContext, BusySlot, Category,
    Classification, ClassifyRequest, ClassifyResponse, Event, ExecuteRequest, ExecuteResponse,
    HealthLog, JournalEntry, Note, PreviousContext, ReceiptAnalysis, ReceiptItem, ReceiptOutcome,
    ShoppingItem, SpeakRequest, TimeSlot, Transaction, TransactionKind, TranscribeResponse,
    TravelMode, TravelSource, TravelTimeRequest, TravelTimeResponse, TravelUsage, Trip, Upload,
    User,
};
