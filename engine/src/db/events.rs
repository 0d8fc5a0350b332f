/// Calendar event persistence
use super::{from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sdk::types::Event;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Fields for an event about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub is_all_day: bool,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            start_time,
            end_time,
            location: None,
            is_all_day: false,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The event as it would look once stored for `user_id`
    pub fn into_event(self, id: String, user_id: &str) -> Event {
        Event {
            id,
            title: self.title,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            location: self.location,
            is_all_day: self.is_all_day,
            user_id: user_id.to_string(),
        }
    }
}

pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, event: NewEvent) -> Result<Event> {
        let mut event = event.into_event(new_id(), user_id);
        event.start_time = stored(event.start_time);
        event.end_time = stored(event.end_time);

        sqlx::query(
            "INSERT INTO events (id, user_id, title, description, start_time, end_time, location, is_all_day)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.id)
        .bind(&event.user_id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(to_millis(event.start_time))
        .bind(to_millis(event.end_time))
        .bind(&event.location)
        .bind(event.is_all_day)
        .execute(&self.pool)
        .await
        .context("Failed to create event")?;

        Ok(event)
    }

    /// All events of a user, earliest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Event>> {
        let rows = sqlx::query("SELECT * FROM events WHERE user_id = ? ORDER BY start_time ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list events")?;

        Ok(rows.iter().map(row_to_event).collect())
    }

    /// Events of a user starting at or after `since`
    pub async fn list_since(&self, user_id: &str, since: DateTime<Utc>) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT * FROM events WHERE user_id = ? AND start_time >= ? ORDER BY start_time ASC",
        )
        .bind(user_id)
        .bind(to_millis(since))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list upcoming events")?;

        Ok(rows.iter().map(row_to_event).collect())
    }

    /// Events of a user starting in `[start, end]`
    pub async fn list_starting_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>> {
        let rows = sqlx::query(
            "SELECT * FROM events
             WHERE user_id = ? AND start_time >= ? AND start_time <= ?
             ORDER BY start_time ASC",
        )
        .bind(user_id)
        .bind(to_millis(start))
        .bind(to_millis(end))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list events in range")?;

        Ok(rows.iter().map(row_to_event).collect())
    }
}

fn row_to_event(row: &SqliteRow) -> Event {
    Event {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        start_time: from_millis(row.get("start_time")),
        end_time: from_millis(row.get("end_time")),
        location: row.get("location"),
        is_all_day: row.get("is_all_day"),
        user_id: row.get("user_id"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::database_with_user;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_create_and_list_sorted() {
        let (_dir, db) = database_with_user("u1").await;
        let repo = db.events();
        let nine = Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap();

        repo.create("u1", NewEvent::new("Late", nine + Duration::hours(5), nine + Duration::hours(6)))
            .await
            .unwrap();
        let early = repo
            .create(
                "u1",
                NewEvent::new("Early", nine, nine + Duration::hours(1)).with_location("Office"),
            )
            .await
            .unwrap();

        let events = repo.list("u1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], early);
        assert_eq!(events[1].title, "Late");
    }

    #[tokio::test]
    async fn test_range_queries() {
        let (_dir, db) = database_with_user("u1").await;
        let repo = db.events();
        let day = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

        repo.create("u1", NewEvent::new("Yesterday", day - Duration::hours(3), day - Duration::hours(2)))
            .await
            .unwrap();
        repo.create("u1", NewEvent::new("Today", day + Duration::hours(10), day + Duration::hours(11)))
            .await
            .unwrap();
        repo.create("u1", NewEvent::new("Tomorrow", day + Duration::hours(34), day + Duration::hours(35)))
            .await
            .unwrap();

        let since = repo.list_since("u1", day).await.unwrap();
        assert_eq!(since.len(), 2);

        let today = repo
            .list_starting_between("u1", day, day + Duration::hours(24) - Duration::milliseconds(1))
            .await
            .unwrap();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].title, "Today");

        assert!(repo.list("nobody").await.unwrap().is_empty());
    }
}
