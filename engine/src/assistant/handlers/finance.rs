use super::{bool_field, f64_field, not_implemented, str_field, HandlerContext};
use crate::assistant::datetime::parse_datetime_in;
use crate::db::NewTransaction;
use anyhow::Result;
use chrono::Local;
use sdk::types::TransactionKind;
use serde_json::{json, Value};
use tracing::info;

pub async fn handle(ctx: &HandlerContext, action: &str, data: &Value) -> Result<Value> {
    match action {
        "create" => create(ctx, data).await,
        "update" | "set" if data.get("balance").is_some() => set_balance(ctx, data).await,
        _ => Ok(not_implemented()),
    }
}

async fn create(ctx: &HandlerContext, data: &Value) -> Result<Value> {
    let tx = NewTransaction {
        amount: f64_field(data, "amount").unwrap_or(0.0),
        currency: str_field(data, "currency").unwrap_or_else(|| "EUR".to_string()),
        kind: str_field(data, "type")
            .map(|t| TransactionKind::parse_lenient(&t))
            .unwrap_or_default(),
        category: str_field(data, "category").unwrap_or_else(|| "Other".to_string()),
        description: str_field(data, "description"),
        date: ctx.now,
        due_date: data
            .get("dueDate")
            .and_then(|v| parse_datetime_in(v, &Local)),
        is_paid: bool_field(data, "isPaid"),
    };

    let transaction = ctx.db.transactions().create(&ctx.user_id, tx).await?;
    info!(
        "Created {} of {:.2} {}",
        transaction.kind.as_str(),
        transaction.amount,
        transaction.currency
    );

    Ok(json!({ "message": "Transaction created", "transaction": transaction }))
}

async fn set_balance(ctx: &HandlerContext, data: &Value) -> Result<Value> {
    let Some(balance) = f64_field(data, "balance") else {
        return Ok(json!({ "message": "Invalid balance" }));
    };

    ctx.db.users().set_balance(&ctx.user_id, balance).await?;

    Ok(json!({
        "message": format!("Balance updated to €{:.2}", balance),
        "balance": balance,
    }))
}
