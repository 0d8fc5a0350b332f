//! The command pipeline: classify free text, then execute the intent
//!
//! ```text
//! text ──► Classifier ──► Classification ──► Executor ──► handlers::<category>
//!                                              │
//!                                              └─ calendar: conflicts::detect_conflicts
//! ```

pub mod briefing;
pub mod classifier;
pub mod conflicts;
pub mod datetime;
pub mod executor;
pub mod handlers;

pub use briefing::BriefingService;
pub use classifier::Classifier;
pub use conflicts::{detect_conflicts, Conflict, ConflictReport};
pub use executor::Executor;
