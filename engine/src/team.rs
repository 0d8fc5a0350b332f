//! Shared free time across several users' calendars

use crate::assistant::datetime::{day_bounds_in, local_to_utc, parse_date_in};
use crate::db::Database;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use sdk::errors::EngineError;
use sdk::types::{AvailabilityResponse, BusySlot, TimeSlot};
use std::collections::BTreeMap;
use tracing::debug;

pub const WORKDAY_START_HOUR: u32 = 9;
pub const WORKDAY_END_HOUR: u32 = 18;
pub const STEP_MINUTES: i64 = 30;
pub const SLOT_MINUTES: i64 = 60;
pub const MAX_SLOTS: usize = 3;

/// Every one-hour slot starting on a 30-minute step in `[window_start, window_end)`
/// that overlaps none of `busy`. A slot may run past `window_end`.
pub fn free_slots(
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    busy: &[BusySlot],
) -> Vec<TimeSlot> {
    let step = Duration::minutes(STEP_MINUTES);
    let length = Duration::minutes(SLOT_MINUTES);
    let mut slots = Vec::new();

    let mut current = window_start;
    while current < window_end {
        let slot_end = current + length;
        let taken = busy
            .iter()
            .any(|b| current < b.end_time && slot_end > b.start_time);
        if !taken {
            slots.push(TimeSlot {
                start: current,
                end: slot_end,
            });
        }
        current += step;
    }

    slots
}

fn at_hour<Tz: TimeZone>(date: NaiveDate, hour: u32, tz: &Tz) -> Option<DateTime<Utc>> {
    local_to_utc(&date.and_time(NaiveTime::from_hms_opt(hour, 0, 0)?), tz)
}

pub struct TeamService {
    db: Database,
}

impl TeamService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn availability(
        &self,
        user_ids: Vec<String>,
        date: Option<String>,
    ) -> Result<AvailabilityResponse, EngineError> {
        let day = match date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(text) => parse_date_in(text, &Local)
                .ok_or_else(|| EngineError::InvalidRequest(format!("Invalid date: {}", text)))?,
            None => Local::now().date_naive(),
        };
        self.availability_on(user_ids, day, &Local).await
    }

    /// Availability on `day`, with working hours interpreted in `tz`
    pub async fn availability_on<Tz: TimeZone>(
        &self,
        user_ids: Vec<String>,
        day: NaiveDate,
        tz: &Tz,
    ) -> Result<AvailabilityResponse, EngineError> {
        let invalid = || EngineError::InvalidRequest("Invalid date".to_string());
        let (day_start, day_end) = day_bounds_in(day, tz).ok_or_else(invalid)?;
        let window_start = at_hour(day, WORKDAY_START_HOUR, tz).ok_or_else(invalid)?;
        let window_end = at_hour(day, WORKDAY_END_HOUR, tz).ok_or_else(invalid)?;

        let mut schedules: BTreeMap<String, Vec<BusySlot>> = BTreeMap::new();
        for user_id in user_ids {
            if schedules.contains_key(&user_id) {
                continue;
            }
            let events = self
                .db
                .events()
                .list_starting_between(&user_id, day_start, day_end)
                .await
                .map_err(|e| EngineError::Database(format!("{:#}", e)))?;

            let busy = events
                .into_iter()
                .map(|e| BusySlot {
                    id: e.id,
                    title: e.title,
                    start_time: e.start_time,
                    end_time: e.end_time,
                })
                .collect();
            schedules.insert(user_id, busy);
        }

        let all_busy: Vec<BusySlot> = schedules.values().flatten().cloned().collect();
        let mut free = free_slots(window_start, window_end, &all_busy);
        debug!(
            "{} users, {} busy events, {} free slots on {}",
            schedules.len(),
            all_busy.len(),
            free.len(),
            day
        );
        free.truncate(MAX_SLOTS);

        Ok(AvailabilityResponse {
            schedules,
            free_slots: free,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::database_with_user;
    use crate::db::NewEvent;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn busy(start: DateTime<Utc>, end: DateTime<Utc>) -> BusySlot {
        BusySlot {
            id: "e".into(),
            title: "busy".into(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_empty_day_has_eighteen_slots() {
        let slots = free_slots(at(9, 0), at(18, 0), &[]);
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0], TimeSlot { start: at(9, 0), end: at(10, 0) });
        assert_eq!(slots[17].start, at(17, 30));
    }

    #[test]
    fn test_busy_morning_pushes_first_slot() {
        let slots = free_slots(at(9, 0), at(18, 0), &[busy(at(9, 0), at(11, 0))]);
        assert_eq!(slots[0].start, at(11, 0));
    }

    proptest! {
        #[test]
        fn prop_free_slots_never_overlap_busy(start_h in 9u32..18, len_m in 15i64..240) {
            let b = busy(at(start_h, 0), at(start_h, 0) + Duration::minutes(len_m));
            for slot in free_slots(at(9, 0), at(18, 0), std::slice::from_ref(&b)) {
                prop_assert!(slot.end <= b.start_time || slot.start >= b.end_time);
            }
        }
    }

    #[tokio::test]
    async fn test_two_users_share_a_slot() {
        let (_dir, db) = database_with_user("alice").await;
        db.users().ensure("bob", "bob@example.com", None).await.unwrap();
        db.events()
            .create("alice", NewEvent::new("Standup", at(9, 0), at(10, 0)))
            .await
            .unwrap();
        db.events()
            .create("bob", NewEvent::new("Review", at(10, 0), at(11, 0)))
            .await
            .unwrap();

        let service = TeamService::new(db);
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let out = service
            .availability_on(vec!["alice".into(), "bob".into(), "alice".into()], day, &Utc)
            .await
            .unwrap();

        assert_eq!(out.schedules.len(), 2);
        assert_eq!(out.schedules["alice"][0].title, "Standup");
        assert_eq!(out.schedules["bob"][0].title, "Review");
        assert_eq!(
            out.free_slots,
            vec![
                TimeSlot { start: at(11, 0), end: at(12, 0) },
                TimeSlot { start: at(11, 30), end: at(12, 30) },
                TimeSlot { start: at(12, 0), end: at(13, 0) },
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_users_get_empty_schedules() {
        let (_dir, db) = database_with_user("alice").await;
        let service = TeamService::new(db);
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let out = service
            .availability_on(vec!["ghost".into()], day, &Utc)
            .await
            .unwrap();
        assert_eq!(out.schedules["ghost"], Vec::<BusySlot>::new());
        assert_eq!(out.free_slots.len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_date() {
        let (_dir, db) = database_with_user("alice").await;
        let err = TeamService::new(db)
            .availability(vec!["alice".into()], Some("next blursday".into()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid date: next blursday");
    }
}
