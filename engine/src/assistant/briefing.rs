//! Morning briefing from today's events and the open shopping list

use super::datetime::day_bounds_in;
use crate::db::Database;
use crate::llm::{CompletionOptions, LLMProvider, Message};
use chrono::{DateTime, Local, Utc};
use sdk::errors::EngineError;
use sdk::types::{Briefing, BriefingContext};
use std::sync::Arc;
use tracing::warn;

const BRIEFING_PROMPT: &str = "You are a helpful personal assistant. Generate a concise, motivating \
morning briefing based on the user's schedule and tasks. Keep it under 100 words. Be friendly.";

pub struct BriefingService {
    db: Database,
    provider: Arc<dyn LLMProvider>,
    temperature: f64,
    default_user_id: String,
}

impl BriefingService {
    pub fn new(
        db: Database,
        provider: Arc<dyn LLMProvider>,
        temperature: f64,
        default_user_id: impl Into<String>,
    ) -> Self {
        Self {
            db,
            provider,
            temperature,
            default_user_id: default_user_id.into(),
        }
    }

    pub async fn briefing(&self, user_id: Option<String>) -> Result<Briefing, EngineError> {
        self.briefing_at(user_id, Utc::now()).await
    }

    pub async fn briefing_at(
        &self,
        user_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Briefing, EngineError> {
        let user_id = user_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| self.default_user_id.clone());

        let context = self.gather(&user_id, now).await?;
        let fallback = static_briefing(&context);

        if !self.provider.is_configured() {
            return Ok(Briefing {
                briefing: fallback,
                context,
            });
        }

        let payload = serde_json::to_string(&context).unwrap_or_default();
        let messages = [Message::system(BRIEFING_PROMPT), Message::user(payload)];

        let briefing = match self
            .provider
            .complete(&messages, &CompletionOptions::with_temperature(self.temperature))
            .await
        {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback,
            Err(e) => {
                warn!("Briefing generation failed, using summary: {}", e);
                fallback
            }
        };

        Ok(Briefing { briefing, context })
    }

    async fn gather(&self, user_id: &str, now: DateTime<Utc>) -> Result<BriefingContext, EngineError> {
        let today = now.with_timezone(&Local).date_naive();
        let (start, end) = day_bounds_in(today, &Local)
            .ok_or_else(|| EngineError::InvalidRequest("Invalid date".to_string()))?;

        let events = self
            .db
            .events()
            .list_starting_between(user_id, start, end)
            .await
            .map_err(|e| EngineError::Database(format!("{:#}", e)))?;
        let tasks = self
            .db
            .shopping()
            .list_unchecked(user_id)
            .await
            .map_err(|e| EngineError::Database(format!("{:#}", e)))?;

        Ok(BriefingContext {
            date: today.format("%a %b %d %Y").to_string(),
            events: events
                .iter()
                .map(|e| {
                    format!(
                        "{} at {}",
                        e.title,
                        e.start_time.with_timezone(&Local).format("%H:%M")
                    )
                })
                .collect(),
            tasks: tasks.into_iter().map(|t| t.name).collect(),
        })
    }
}

fn static_briefing(context: &BriefingContext) -> String {
    format!(
        "Good morning! Today is {}. You have {} events and {} items to buy.",
        context.date,
        context.events.len(),
        context.tasks.len()
    )
}
