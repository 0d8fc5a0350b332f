//! Calendar conflict detection
//!
//! A candidate event conflicts with an existing one when their ranges
//! overlap (touching ranges do not), or when both have different locations
//! and the gap between them is shorter than the travel time. Each direction
//! (existing before candidate, candidate before existing) is checked on its
//! own, so one existing event can be reported twice.

use crate::db::NewEvent;
use crate::travel::TravelTimeSource;
use chrono::Duration;
use sdk::types::{Event, TravelMode};
use serde::Serialize;

/// Gaps this short or shorter trigger a travel-time lookup
const TRAVEL_CHECK_WINDOW_MINUTES: i64 = 60;

/// An existing event in the way, with the reason when it is not a plain overlap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    #[serde(flatten)]
    pub event: Event,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    pub suggestions: Vec<String>,
}

impl ConflictReport {
    pub fn has_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

fn distinct_locations<'a>(a: Option<&'a str>, b: Option<&'a str>) -> Option<(&'a str, &'a str)> {
    match (a.map(str::trim), b.map(str::trim)) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() && a != b => Some((a, b)),
        _ => None,
    }
}

fn travel_reason(minutes: u32) -> String {
    format!("Not enough time to travel ({} min needed)", minutes)
}

/// Scan `existing` for events that clash with `candidate`.
pub async fn detect_conflicts(
    candidate: &NewEvent,
    existing: &[Event],
    travel: &dyn TravelTimeSource,
) -> ConflictReport {
    let window = Duration::minutes(TRAVEL_CHECK_WINDOW_MINUTES);
    let mut conflicts = Vec::new();

    for event in existing {
        if candidate.start_time < event.end_time && candidate.end_time > event.start_time {
            conflicts.push(Conflict {
                event: event.clone(),
                reason: None,
            });
            continue;
        }

        let Some((new_location, existing_location)) =
            distinct_locations(candidate.location.as_deref(), event.location.as_deref())
        else {
            continue;
        };

        // Existing event ends shortly before the candidate starts
        let gap_after = candidate.start_time - event.end_time;
        if gap_after.abs() < window {
            let minutes = travel
                .minutes_between(existing_location, new_location, TravelMode::Transit)
                .await;
            if gap_after < Duration::minutes(i64::from(minutes)) {
                conflicts.push(Conflict {
                    event: event.clone(),
                    reason: Some(travel_reason(minutes)),
                });
            }
        }

        // Candidate ends shortly before the existing event starts
        let gap_before = event.start_time - candidate.end_time;
        if gap_before.abs() < window {
            let minutes = travel
                .minutes_between(new_location, existing_location, TravelMode::Transit)
                .await;
            if gap_before < Duration::minutes(i64::from(minutes)) {
                conflicts.push(Conflict {
                    event: event.clone(),
                    reason: Some(travel_reason(minutes)),
                });
            }
        }
    }

    let suggestions = match conflicts.first() {
        Some(first) => vec![
            format!("Move \"{}\" one hour later", candidate.title),
            "Plan more travel time".to_string(),
            first
                .reason
                .clone()
                .unwrap_or_else(|| format!("Overlaps with \"{}\"", first.event.title)),
        ],
        None => Vec::new(),
    };

    ConflictReport {
        conflicts,
        suggestions,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FixedTravel;
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, m, 0).unwrap()
    }

    fn existing(title: &str, start: DateTime<Utc>, end: DateTime<Utc>, location: Option<&str>) -> Event {
        let mut e = NewEvent::new(title, start, end);
        e.location = location.map(str::to_string);
        e.into_event(format!("id-{}", title), "u1")
    }

    #[tokio::test]
    async fn test_overlap_is_conflict() {
        let travel = FixedTravel::new(15);
        let events = vec![existing("Team Meeting", at(10, 0), at(11, 0), Some("Office"))];
        let candidate = NewEvent::new("Dentist", at(10, 30), at(11, 30));

        let report = detect_conflicts(&candidate, &events, &travel).await;
        assert!(report.has_conflict());
        assert_eq!(report.conflicts[0].reason, None);
        assert_eq!(
            report.suggestions,
            vec![
                "Move \"Dentist\" one hour later".to_string(),
                "Plan more travel time".to_string(),
                "Overlaps with \"Team Meeting\"".to_string(),
            ]
        );
        assert!(travel.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_touching_ranges_do_not_overlap() {
        let travel = FixedTravel::new(15);
        let events = vec![existing("Team Meeting", at(10, 0), at(11, 0), None)];
        let candidate = NewEvent::new("Next", at(11, 0), at(12, 0));

        let report = detect_conflicts(&candidate, &events, &travel).await;
        assert!(!report.has_conflict());
        assert!(report.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_short_gap_at_other_location_needs_travel() {
        let travel = FixedTravel::new(25);
        let events = vec![existing("Team Meeting", at(10, 0), at(11, 0), Some("Office"))];
        let candidate = NewEvent::new("Lunch", at(11, 15), at(12, 0)).with_location("Vapiano");

        let report = detect_conflicts(&candidate, &events, &travel).await;
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(
            report.conflicts[0].reason.as_deref(),
            Some("Not enough time to travel (25 min needed)")
        );
        assert_eq!(report.suggestions[2], "Not enough time to travel (25 min needed)");
        assert_eq!(
            travel.lookups.lock().unwrap().as_slice(),
            &[("Office".to_string(), "Vapiano".to_string())]
        );
    }

    #[tokio::test]
    async fn test_enough_gap_is_fine() {
        let travel = FixedTravel::new(10);
        let events = vec![existing("Team Meeting", at(10, 0), at(11, 0), Some("Office"))];
        let candidate = NewEvent::new("Lunch", at(11, 15), at(12, 0)).with_location("Vapiano");

        let report = detect_conflicts(&candidate, &events, &travel).await;
        assert!(!report.has_conflict());
    }

    #[tokio::test]
    async fn test_candidate_before_existing_checks_reverse_direction() {
        let travel = FixedTravel::new(30);
        let events = vec![existing("Project Review", at(15, 0), at(16, 0), Some("Zoom HQ"))];
        let candidate = NewEvent::new("Coffee", at(14, 0), at(14, 45)).with_location("Cafe");

        let report = detect_conflicts(&candidate, &events, &travel).await;
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(
            travel.lookups.lock().unwrap().as_slice(),
            &[("Cafe".to_string(), "Zoom HQ".to_string())]
        );
    }

    #[tokio::test]
    async fn test_same_location_skips_travel() {
        let travel = FixedTravel::new(30);
        let events = vec![existing("A", at(10, 0), at(11, 0), Some("Office"))];
        let candidate = NewEvent::new("B", at(11, 5), at(12, 0)).with_location("Office");

        let report = detect_conflicts(&candidate, &events, &travel).await;
        assert!(!report.has_conflict());
        assert!(travel.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_serializes_flat() {
        let travel = FixedTravel::new(25);
        let events = vec![existing("Team Meeting", at(10, 0), at(11, 0), Some("Office"))];
        let candidate = NewEvent::new("Lunch", at(11, 15), at(12, 0)).with_location("Vapiano");

        let report = detect_conflicts(&candidate, &events, &travel).await;
        let v = serde_json::to_value(&report.conflicts[0]).unwrap();
        assert_eq!(v["title"], json!("Team Meeting"));
        assert_eq!(v["reason"], json!("Not enough time to travel (25 min needed)"));
        assert_eq!(v["startTime"], json!("2025-06-02T10:00:00Z"));
    }
}
