use super::{not_implemented, str_field, tags_field, HandlerContext};
use anyhow::Result;
use serde_json::{json, Value};

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    if action != "create" {
        return Ok(not_implemented());
    }

    let title = str_field(data, "title").unwrap_or_else(|| "Untitled Note".to_string());
    let content = str_field(data, "content").unwrap_or_default();

    let note = ctx
        .db
        .notes()
        .create(&ctx.user_id, &title, &content, tags_field(data, "tags"))
        .await?;

    Ok(json!({ "message": "Note created", "note": note }))
}
