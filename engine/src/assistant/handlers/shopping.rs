use super::{not_implemented, str_field, HandlerContext};
use anyhow::Result;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
struct RequestedItem {
    name: String,
    quantity: Option<String>,
}

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    match action {
        "create" | "add" => create(ctx, data).await,
        "update" | "check" => check(ctx, data).await,
        _ => Ok(not_implemented()),
    }
}

/// Items from `items` (strings or `{name, quantity}`) or a single `name`/`item`
fn requested_items(data: &Value) -> Vec<RequestedItem> {
    if let Some(items) = data.get("items").and_then(Value::as_array) {
        return items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(RequestedItem {
                    name: s.trim().to_string(),
                    quantity: None,
                }),
                Value::Object(_) => str_field(item, "name").map(|name| RequestedItem {
                    name,
                    quantity: str_field(item, "quantity"),
                }),
                _ => None,
            })
            .collect();
    }

    str_field(data, "name")
        .or_else(|| str_field(data, "item"))
        .map(|name| RequestedItem {
            name,
            quantity: str_field(data, "quantity"),
        })
        .into_iter()
        .collect()
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

async fn create(ctx: &HandlerContext, data: &Value) -> Result<Value> {
    let requested = requested_items(data);
    if requested.is_empty() {
        return Ok(json!({ "message": "No items specified.", "added": [], "duplicates": [] }));
    }

    let repo = ctx.db.shopping();
    let mut seen: HashSet<String> = repo
        .list_unchecked(&ctx.user_id)
        .await?
        .iter()
        .map(|item| normalize(&item.name))
        .collect();

    let mut added = Vec::new();
    let mut duplicates = Vec::new();

    for item in requested {
        if !seen.insert(normalize(&item.name)) {
            duplicates.push(item.name);
            continue;
        }
        added.push(
            repo.create(&ctx.user_id, &item.name, item.quantity.as_deref())
                .await?,
        );
    }

    info!("Shopping list: {} added, {} duplicates", added.len(), duplicates.len());

    let message = match (added.len(), duplicates.len()) {
        (0, _) => format!("Already on your list: {}", duplicates.join(", ")),
        (n, 0) => format!("Added {} item(s) to your shopping list", n),
        (n, _) => format!(
            "Added {} item(s). Already on your list: {}",
            n,
            duplicates.join(", ")
        ),
    };

    Ok(json!({ "message": message, "added": added, "duplicates": duplicates }))
}

async fn check(ctx: &HandlerContext, data: &Value) -> Result<Value> {
    let names: Vec<String> = requested_items(data).into_iter().map(|i| i.name).collect();
    if names.is_empty() {
        return Ok(not_implemented());
    }

    let repo = ctx.db.shopping();
    let mut checked = Vec::new();
    let mut missing = Vec::new();
    for name in names {
        if repo.check_by_name(&ctx.user_id, &name).await? > 0 {
            checked.push(name);
        } else {
            missing.push(name);
        }
    }

    Ok(json!({
        "message": format!("Checked off {} item(s)", checked.len()),
        "checked": checked,
        "notFound": missing,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::handlers::test_support::context;

    #[test]
    fn test_requested_item_shapes() {
        let items = requested_items(&json!({"items": ["Milch", {"name": "Eggs", "quantity": 6}, "", 3]}));
        assert_eq!(
            items,
            vec![
                RequestedItem { name: "Milch".into(), quantity: None },
                RequestedItem { name: "Eggs".into(), quantity: Some("6".into()) },
            ]
        );

        let single = requested_items(&json!({"item": "Bread"}));
        assert_eq!(single.len(), 1);
        assert!(requested_items(&json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_dedup_against_list_and_request() {
        let (_dir, db, ctx) = context(15).await;
        db.shopping().create("u1", "Milk", None).await.unwrap();

        let out = handle(&ctx, "create", &json!({"items": ["milk", "Bread", " bread ", "Eggs"]}))
            .await
            .unwrap();

        let added: Vec<&str> = out["added"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(added, vec!["Bread", "Eggs"]);
        assert_eq!(out["duplicates"], json!(["milk", "bread"]));
        assert_eq!(out["message"], "Added 2 item(s). Already on your list: milk, bread");

        assert_eq!(db.shopping().list("u1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_checked_items_do_not_block() {
        let (_dir, db, ctx) = context(15).await;
        db.shopping().create("u1", "Milk", None).await.unwrap();
        db.shopping().check_by_name("u1", "milk").await.unwrap();

        let out = handle(&ctx, "create", &json!({"name": "MILK"})).await.unwrap();
        assert_eq!(out["added"].as_array().unwrap().len(), 1);
        assert_eq!(out["duplicates"], json!([]));
        assert_eq!(out["message"], "Added 1 item(s) to your shopping list");
    }

    #[tokio::test]
    async fn test_check_action() {
        let (_dir, db, ctx) = context(15).await;
        db.shopping().create("u1", "Milk", None).await.unwrap();

        let out = handle(&ctx, "check", &json!({"items": ["milk", "Butter"]}))
            .await
            .unwrap();
        assert_eq!(out["checked"], json!(["milk"]));
        assert_eq!(out["notFound"], json!(["Butter"]));
        assert!(db.shopping().list_unchecked("u1").await.unwrap().is_empty());
    }
}
