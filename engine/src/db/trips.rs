/// Trip persistence
use super::{from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sdk::types::{TravelMode, Trip};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub destination: String,
    pub origin: Option<String>,
    pub mode: TravelMode,
    pub duration_minutes: u32,
    pub departure_time: DateTime<Utc>,
    pub event_id: Option<String>,
}

pub struct TripRepository {
    pool: SqlitePool,
}

impl TripRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, trip: NewTrip) -> Result<Trip> {
        let trip = Trip {
            id: new_id(),
            destination: trip.destination,
            origin: trip.origin,
            mode: trip.mode,
            duration_minutes: trip.duration_minutes,
            departure_time: stored(trip.departure_time),
            event_id: trip.event_id,
            user_id: user_id.to_string(),
        };

        sqlx::query(
            "INSERT INTO trips (id, user_id, destination, origin, mode, duration_minutes, departure_time, event_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&trip.id)
        .bind(&trip.user_id)
        .bind(&trip.destination)
        .bind(&trip.origin)
        .bind(trip.mode.as_str())
        .bind(i64::from(trip.duration_minutes))
        .bind(to_millis(trip.departure_time))
        .bind(&trip.event_id)
        .execute(&self.pool)
        .await
        .context("Failed to create trip")?;

        Ok(trip)
    }

    /// Soonest departure first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Trip>> {
        let rows = sqlx::query("SELECT * FROM trips WHERE user_id = ? ORDER BY departure_time ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list trips")?;

        Ok(rows
            .iter()
            .map(|row| {
                let mode: String = row.get("mode");
                let duration: i64 = row.get("duration_minutes");
                Trip {
                    id: row.get("id"),
                    destination: row.get("destination"),
                    origin: row.get("origin"),
                    mode: mode.parse().unwrap_or_default(),
                    duration_minutes: u32::try_from(duration).unwrap_or(0),
                    departure_time: from_millis(row.get("departure_time")),
                    event_id: row.get("event_id"),
                    user_id: row.get("user_id"),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::database_with_user;
    use crate::db::NewEvent;
    use chrono::Duration;

    #[tokio::test]
    async fn test_trip_links_event() {
        let (_dir, db) = database_with_user("u1").await;
        let now = Utc::now();
        let event = db
            .events()
            .create("u1", NewEvent::new("Trip to Berlin (driving)", now, now + Duration::minutes(40)))
            .await
            .unwrap();

        let trip = db
            .trips()
            .create(
                "u1",
                NewTrip {
                    destination: "Berlin".into(),
                    origin: Some("Potsdam".into()),
                    mode: TravelMode::Driving,
                    duration_minutes: 40,
                    departure_time: now,
                    event_id: Some(event.id.clone()),
                },
            )
            .await
            .unwrap();

        let trips = db.trips().list("u1").await.unwrap();
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, trip.id);
        assert_eq!(trips[0].mode, TravelMode::Driving);
        assert_eq!(trips[0].event_id.as_deref(), Some(event.id.as_str()));
    }
}
