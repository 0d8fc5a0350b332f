use super::{f64_field, not_implemented, str_field, tags_field, HandlerContext};
use crate::db::NewJournalEntry;
use anyhow::Result;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

static MOOD_PATTERNS: OnceLock<Vec<(Regex, &'static str, f64)>> = OnceLock::new();

/// Keyword mood detection; the first matching group wins
pub fn detect_mood(content: &str) -> (&'static str, f64) {
    let patterns = MOOD_PATTERNS.get_or_init(|| {
        vec![
            (
                Regex::new(r"(?i)happy|good|great|awesome|love").expect("Invalid happy pattern"),
                "happy",
                0.8,
            ),
            (
                Regex::new(r"(?i)sad|bad|terrible|hate|depressed").expect("Invalid sad pattern"),
                "sad",
                -0.5,
            ),
            (
                Regex::new(r"(?i)stressed|busy|tired").expect("Invalid stressed pattern"),
                "stressed",
                -0.2,
            ),
        ]
    });

    patterns
        .iter()
        .find(|(re, _, _)| re.is_match(content))
        .map(|(_, mood, score)| (*mood, *score))
        .unwrap_or(("neutral", 0.0))
}

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    if action != "create" {
        return Ok(not_implemented());
    }

    let content = str_field(data, "content").unwrap_or_default();
    let (detected, score) = detect_mood(&content);

    let entry = NewJournalEntry {
        mood: str_field(data, "mood").unwrap_or_else(|| detected.to_string()),
        sentiment_score: f64_field(data, "sentimentScore").unwrap_or(score),
        tags: tags_field(data, "tags"),
        date: ctx.now,
        content,
    };

    let journal = ctx.db.journal().create(&ctx.user_id, entry).await?;

    Ok(json!({
        "message": "Journal entry created",
        "journal": journal,
        "detectedMood": detected,
    }))
}
