/// Note persistence
use super::{decode_tags, encode_tags, from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::Utc;
use sdk::types::Note;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct NoteRepository {
    pool: SqlitePool,
}

impl NoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<Note> {
        let now = stored(Utc::now());
        let note = Note {
            id: new_id(),
            title: title.to_string(),
            content: content.to_string(),
            tags,
            created_at: now,
            updated_at: now,
            user_id: user_id.to_string(),
        };

        sqlx::query(
            "INSERT INTO notes (id, user_id, title, content, tags, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&note.id)
        .bind(&note.user_id)
        .bind(&note.title)
        .bind(&note.content)
        .bind(encode_tags(&note.tags))
        .bind(to_millis(note.created_at))
        .bind(to_millis(note.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to create note")?;

        Ok(note)
    }

    /// Most recently updated first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Note>> {
        let rows = sqlx::query("SELECT * FROM notes WHERE user_id = ? ORDER BY updated_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list notes")?;

        Ok(rows.iter().map(row_to_note).collect())
    }
}

fn row_to_note(row: &SqliteRow) -> Note {
    let tags: String = row.get("tags");
    Note {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        tags: decode_tags(&tags),
        created_at: from_millis(row.get("created_at")),
        updated_at: from_millis(row.get("updated_at")),
        user_id: row.get("user_id"),
    }
}
