/// Journal persistence
use super::{decode_tags, encode_tags, from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sdk::types::JournalEntry;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq)]
pub struct NewJournalEntry {
    pub content: String,
    pub mood: String,
    pub sentiment_score: f64,
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
}

pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, entry: NewJournalEntry) -> Result<JournalEntry> {
        let entry = JournalEntry {
            id: new_id(),
            content: entry.content,
            mood: entry.mood,
            sentiment_score: entry.sentiment_score,
            tags: entry.tags,
            date: stored(entry.date),
            user_id: user_id.to_string(),
        };

        sqlx::query(
            "INSERT INTO journal_entries (id, user_id, content, mood, sentiment_score, tags, date)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.content)
        .bind(&entry.mood)
        .bind(entry.sentiment_score)
        .bind(encode_tags(&entry.tags))
        .bind(to_millis(entry.date))
        .execute(&self.pool)
        .await
        .context("Failed to create journal entry")?;

        Ok(entry)
    }

    /// Newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query("SELECT * FROM journal_entries WHERE user_id = ? ORDER BY date DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list journal entries")?;

        Ok(rows
            .iter()
            .map(|row| {
                let tags: String = row.get("tags");
                JournalEntry {
                    id: row.get("id"),
                    content: row.get("content"),
                    mood: row.get("mood"),
                    sentiment_score: row.get("sentiment_score"),
                    tags: decode_tags(&tags),
                    date: from_millis(row.get("date")),
                    user_id: row.get("user_id"),
                }
            })
            .collect())
    }
}
