/// Health log persistence
use super::{from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sdk::types::HealthLog;
use sqlx::{Row, SqlitePool};

pub struct HealthRepository {
    pool: SqlitePool,
}

impl HealthRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        kind: &str,
        value: &str,
        date: DateTime<Utc>,
    ) -> Result<HealthLog> {
        let log = HealthLog {
            id: new_id(),
            kind: kind.to_string(),
            value: value.to_string(),
            date: stored(date),
            user_id: user_id.to_string(),
        };

        sqlx::query("INSERT INTO health_logs (id, user_id, kind, value, date) VALUES (?, ?, ?, ?, ?)")
            .bind(&log.id)
            .bind(&log.user_id)
            .bind(&log.kind)
            .bind(&log.value)
            .bind(to_millis(log.date))
            .execute(&self.pool)
            .await
            .context("Failed to create health log")?;

        Ok(log)
    }

    /// Newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<HealthLog>> {
        let rows = sqlx::query("SELECT * FROM health_logs WHERE user_id = ? ORDER BY date DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list health logs")?;

        Ok(rows
            .iter()
            .map(|row| HealthLog {
                id: row.get("id"),
                kind: row.get("kind"),
                value: row.get("value"),
                date: from_millis(row.get("date")),
                user_id: row.get("user_id"),
            })
            .collect())
    }
}
