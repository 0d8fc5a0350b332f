//! Free text to structured intent via a chat completion

use crate::llm::{extract_json_object, CompletionOptions, LLMProvider, Message};
use sdk::errors::EngineError;
use sdk::types::{Classification, ClassifyResponse, PreviousContext};
use std::sync::Arc;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = r#"You are an AI assistant that classifies user input and extracts structured data for a Life OS application.

Categories:
- calendar: Events, appointments, meetings
- finance: Bills, income, expenses, payments, account balance
- shopping: Shopping lists, items to buy, recipe ingredients
- health: Sleep logs, doctor appointments, vitals
- home: Home automation commands
- notes: Knowledge base entries, notes, learnings
- travel: Trip planning, routes, connections
- documents: Document storage, ID cards, licenses
- journal: Mood tracking, daily thoughts

Extract the following JSON structure:
{
  "category": "calendar|finance|shopping|health|home|notes|travel|documents|journal",
  "action": "create|update|delete|query",
  "data": {
    // Relevant fields based on category
  }
}

Use ISO 8601 local date-times (YYYY-MM-DDTHH:MM) for startTime, endTime and dueDate.

If the input is too vague to act on (for example a meeting without a time), ask ONE short clarifying question instead:
{"category":"question","question":"...","data":{"originalIntent":{ /* the partial classification */ }}}

Examples:
Input: "Arzttermin am Donnerstag um 15 Uhr"
Output: {"category":"calendar","action":"create","data":{"title":"Arzttermin","startTime":"2025-06-05T15:00","type":"appointment"}}

Input: "Miete zahlen 800 Euro fällig am 1."
Output: {"category":"finance","action":"create","data":{"type":"expense","category":"Rent","amount":800,"currency":"EUR","dueDate":"2025-07-01"}}

Input: "Ich brauche Milch und Brot"
Output: {"category":"shopping","action":"create","data":{"items":["Milch","Brot"]}}

Input: "Mein Kontostand ist 1500 Euro"
Output: {"category":"finance","action":"update","data":{"balance":1500}}

Input: "Wie komme ich zum Hauptbahnhof um 16:30?"
Output: {"category":"travel","action":"create","data":{"to":"Hauptbahnhof","departureTime":"16:30","mode":"transit"}}

Answer with the JSON object only."#;

pub struct Classifier {
    provider: Arc<dyn LLMProvider>,
    temperature: f64,
}

impl Classifier {
    pub fn new(provider: Arc<dyn LLMProvider>, temperature: f64) -> Self {
        Self {
            provider,
            temperature,
        }
    }

    fn build_messages(
        text: &str,
        previous: Option<&PreviousContext>,
        now: chrono::DateTime<chrono::Local>,
    ) -> Vec<Message> {
        let mut messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::system(format!(
                "Current local time: {} ({}).",
                now.format("%Y-%m-%dT%H:%M"),
                now.format("%A")
            )),
        ];

        if let Some(ctx) = previous {
            if ctx.last_question.is_some() || ctx.original_intent.is_some() {
                let intent = ctx
                    .original_intent
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                messages.push(Message::system(format!(
                    "The user is answering your previous question: \"{}\". \
                     The original intent was: {}. \
                     Combine the answer with the original intent and return the completed classification.",
                    ctx.last_question.as_deref().unwrap_or(""),
                    intent
                )));
            }
        }

        messages.push(Message::user(text));
        messages
    }

    pub async fn classify(
        &self,
        text: Option<&str>,
        previous: Option<&PreviousContext>,
    ) -> Result<ClassifyResponse, EngineError> {
        let text = text.map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(EngineError::InvalidRequest("No text provided".to_string()));
        }

        let messages = Self::build_messages(text, previous, chrono::Local::now());
        let raw = self
            .provider
            .complete(&messages, &CompletionOptions::with_temperature(self.temperature))
            .await?;

        if raw.trim().is_empty() {
            return Err(EngineError::LLMProvider("No response from model".to_string()));
        }

        let classification = extract_json_object(&raw)
            .and_then(|v| serde_json::from_value::<Classification>(v).ok())
            .ok_or_else(|| {
                warn!("Failed to parse model response: {}", raw);
                EngineError::parse_with_raw("Failed to parse AI response", raw.clone())
            })?;

        debug!(
            category = %classification.category,
            action = %classification.action,
            "Classified input"
        );

        Ok(ClassifyResponse {
            success: true,
            classification,
            raw,
        })
    }
}
