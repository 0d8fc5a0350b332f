use super::{not_implemented, str_field, HandlerContext};
use crate::assistant::datetime::{parse_datetime_in, time_of_day_in};
use crate::db::{NewEvent, NewTrip};
use anyhow::Result;
use chrono::{Duration, Local};
use sdk::types::TravelMode;
use serde_json::{json, Value};
use tracing::info;

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    match action {
        "create" | "plan" => plan_trip(ctx, data).await,
        _ => Ok(not_implemented()),
    }
}

async fn plan_trip(ctx: &HandlerContext, data: &Value) -> Result<Value> {
    let Some(from) = str_field(data, "from") else {
        return Ok(json!({
            "message": "I need your current location to plan the trip.",
            "needsLocation": true,
            "originalData": data,
        }));
    };

    let Some(destination) = str_field(data, "destination").or_else(|| str_field(data, "to")) else {
        return Ok(json!({ "message": "No destination specified." }));
    };

    let mode = str_field(data, "mode")
        .and_then(|m| m.parse::<TravelMode>().ok())
        .unwrap_or_default();

    let duration = ctx
        .travel
        .minutes_between(&from, &destination, mode)
        .await;

    let departure = str_field(data, "departureTime")
        .and_then(|t| {
            time_of_day_in(&t, ctx.now, &Local)
                .or_else(|| parse_datetime_in(&Value::String(t), &Local))
        })
        .unwrap_or(ctx.now);

    let event = NewEvent::new(
        format!("Trip to {} ({})", destination, mode),
        departure,
        departure + Duration::minutes(i64::from(duration)),
    )
    .with_description(format!("Travel time: {} min. From: {}", duration, from))
    .with_location(destination.clone());

    let event = ctx.db.events().create(&ctx.user_id, event).await?;

    let trip = ctx
        .db
        .trips()
        .create(
            &ctx.user_id,
            NewTrip {
                destination: destination.clone(),
                origin: Some(from.clone()),
                mode,
                duration_minutes: duration,
                departure_time: departure,
                event_id: Some(event.id.clone()),
            },
        )
        .await?;

    info!("Planned trip {} -> {} ({} min, {})", from, destination, duration, mode);

    Ok(json!({
        "message": format!(
            "Found a connection! It takes about {} mins. Added to your calendar.",
            duration
        ),
        "event": event,
        "trip": trip,
        "travelDetails": {
            "from": from,
            "to": destination,
            "duration": duration,
            "mode": mode,
        },
    }))
}
