use super::{bool_field, not_implemented, str_field, HandlerContext};
use crate::assistant::conflicts::detect_conflicts;
use crate::assistant::datetime::{parse_datetime_in, start_of_day_in};
use crate::db::NewEvent;
use anyhow::Result;
use chrono::{Duration, Local};
use serde_json::{json, Value};
use tracing::info;

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    match action {
        "create" => create(ctx, data).await,
        _ => Ok(not_implemented()),
    }
}

fn candidate_from(ctx: &HandlerContext, data: &Value) -> NewEvent {
    let start_time = data
        .get("startTime")
        .and_then(|v| parse_datetime_in(v, &Local))
        .unwrap_or(ctx.now);
    let end_time = data
        .get("endTime")
        .and_then(|v| parse_datetime_in(v, &Local))
        .filter(|end| *end > start_time)
        .unwrap_or(start_time + Duration::hours(1));

    NewEvent {
        title: str_field(data, "title").unwrap_or_else(|| "Unnamed Event".to_string()),
        description: str_field(data, "description"),
        start_time,
        end_time,
        location: str_field(data, "location"),
        is_all_day: bool_field(data, "isAllDay"),
    }
}

/// The candidate as the client sees it before it has an id
fn candidate_json(event: &NewEvent, user_id: &str) -> Value {
    json!({
        "title": event.title,
        "description": event.description,
        "startTime": event.start_time,
        "endTime": event.end_time,
        "location": event.location,
        "isAllDay": event.is_all_day,
        "userId": user_id,
    })
}

async fn create(ctx: &HandlerContext, data: &Value) -> Result<Value> {
    let candidate = candidate_from(ctx, data);

    if !ctx.force {
        let since = start_of_day_in(ctx.now, &Local);
        let existing = ctx.db.events().list_since(&ctx.user_id, since).await?;
        let report = detect_conflicts(&candidate, &existing, ctx.travel.as_ref()).await;

        if report.has_conflict() {
            info!(
                "Event '{}' conflicts with {} existing event(s)",
                candidate.title,
                report.conflicts.len()
            );
            return Ok(json!({
                "message": "Conflict detected!",
                "event": candidate_json(&candidate, &ctx.user_id),
                "needsConfirmation": true,
                "conflicts": report.conflicts,
                "suggestions": report.suggestions,
            }));
        }
    }

    let event = ctx.db.events().create(&ctx.user_id, candidate).await?;
    info!("Created event '{}' ({})", event.title, event.id);

    Ok(json!({ "message": "Event created", "event": event }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::handlers::test_support::context;

    fn meeting(start: &str, end: &str) -> Value {
        json!({"title": "Team Sync", "startTime": start, "endTime": end, "location": "Office"})
    }

    #[tokio::test]
    async fn test_create_then_conflict_then_force() {
        let (_dir, db, mut ctx) = context(15).await;

        let first = handle(&ctx, "create", &meeting("2025-06-02T10:00:00Z", "2025-06-02T11:00:00Z"))
            .await
            .unwrap();
        assert_eq!(first["message"], "Event created");
        assert_eq!(first["event"]["title"], "Team Sync");

        let clash = json!({"title": "Dentist", "startTime": "2025-06-02T10:30:00Z"});
        let blocked = handle(&ctx, "create", &clash).await.unwrap();
        assert_eq!(blocked["message"], "Conflict detected!");
        assert_eq!(blocked["needsConfirmation"], true);
        assert_eq!(blocked["event"]["endTime"], "2025-06-02T11:30:00Z");
        assert_eq!(blocked["conflicts"][0]["title"], "Team Sync");
        assert_eq!(blocked["suggestions"][2], "Overlaps with \"Team Sync\"");
        assert_eq!(db.events().list("u1").await.unwrap().len(), 1);

        ctx.force = true;
        let forced = handle(&ctx, "create", &clash).await.unwrap();
        assert_eq!(forced["message"], "Event created");
        assert_eq!(db.events().list("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_defaults() {
        let (_dir, _db, ctx) = context(15).await;

        let out = handle(&ctx, "create", &json!({"startTime": "Thursday 15:00"}))
            .await
            .unwrap();
        assert_eq!(out["event"]["title"], "Unnamed Event");
        assert_eq!(out["event"]["startTime"], "2025-06-02T08:00:00Z");
        assert_eq!(out["event"]["endTime"], "2025-06-02T09:00:00Z");
        assert_eq!(out["event"]["isAllDay"], false);
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let (_dir, _db, ctx) = context(15).await;
        let out = handle(&ctx, "delete", &json!({})).await.unwrap();
        assert_eq!(out, json!({"message": "Action not implemented"}));
    }
}
