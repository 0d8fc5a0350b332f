use super::{not_implemented, str_field, HandlerContext};
use anyhow::Result;
use serde_json::{json, Value};

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    if action != "create" {
        return Ok(not_implemented());
    }

    let kind = str_field(data, "type").unwrap_or_else(|| "general".to_string());
    let value = str_field(data, "value").unwrap_or_default();

    let log = ctx
        .db
        .health()
        .create(&ctx.user_id, &kind, &value, ctx.now)
        .await?;

    Ok(json!({ "message": "Health log created", "log": log }))
}
