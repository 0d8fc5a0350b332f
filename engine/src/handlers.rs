//! Command handlers for CLI operations
//!
//! Each handler opens the configured database, builds the same
//! [`CoreContext`] the HTTP server uses and prints the result either as
//! human-readable text or as JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::assistant::datetime::time_of_day_in;
use crate::config::{Config, UserConfig};
use crate::db::{Database, NewEvent, NewTransaction};
use crate::secrets::{SecretCache, SecretManager};
use crate::services::build_context;
use api_server::APIServer;
use sdk::types::{
    ClassifyRequest, ExecuteRequest, TransactionKind, TravelMode, TravelTimeRequest,
};
use sdk::CoreContext;

/// Keychain service name for API keys
pub const KEYCHAIN_SERVICE: &str = "mibu";

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Version plus the commit it was built from
pub fn version_string() -> String {
    format!(
        "{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH")
    )
}

async fn open_database(config: &Config) -> Result<Database> {
    Database::new(&config.database_path())
        .await
        .context("Failed to open database")
}

/// Open the database and wire the engine services
pub async fn open_context(config: &Config) -> Result<(Database, CoreContext)> {
    let database = open_database(config).await?;
    let secrets = Arc::new(SecretCache::new(Arc::new(SecretManager::new(
        KEYCHAIN_SERVICE,
    ))));
    let ctx = build_context(config, database.clone(), secrets);
    Ok((database, ctx))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Serve the HTTP API until Ctrl-C
pub async fn handle_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let (database, ctx) = open_context(config).await?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let mut server =
        APIServer::new(ctx, version_string()).with_permissive_cors(config.server.permissive_cors);
    let addr = server.start(&host, port).await?;
    println!("Mibu API listening on http://{}", addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    server.stop().await?;
    database.close().await?;
    Ok(())
}

/// Classify text and optionally execute the result
pub async fn handle_plan(
    text: String,
    execute: bool,
    force: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (_database, ctx) = open_context(config).await?;

    let classified = ctx
        .assistant
        .classify(ClassifyRequest {
            text: Some(text),
            previous_context: None,
        })
        .await?;
    let classification = classified.classification;

    if classification.is_question() {
        match format {
            OutputFormat::Text => println!(
                "{}",
                classification.question.as_deref().unwrap_or("Could you clarify?")
            ),
            OutputFormat::Json => print_json(&classification)?,
        }
        return Ok(());
    }

    if !execute {
        match format {
            OutputFormat::Text => {
                println!("Category: {}", classification.category);
                println!("Action:   {}", classification.action);
                println!("Data:     {}", serde_json::to_string_pretty(&classification.data)?);
            }
            OutputFormat::Json => print_json(&classification)?,
        }
        return Ok(());
    }

    let executed = ctx
        .assistant
        .execute(ExecuteRequest {
            classification: Some(classification),
            force,
        })
        .await?;

    match format {
        OutputFormat::Text => {
            println!("{} / {}", executed.category, executed.action);
            print_result_text(&executed.result);
        }
        OutputFormat::Json => print_json(&executed)?,
    }
    Ok(())
}

fn print_result_text(result: &Value) {
    if let Some(message) = result.get("message").and_then(Value::as_str) {
        println!("{}", message);
    }
    if let Some(suggestions) = result.get("suggestions").and_then(Value::as_array) {
        for suggestion in suggestions.iter().filter_map(Value::as_str) {
            println!("  - {}", suggestion);
        }
        println!("Re-run with --force to create it anyway.");
    }
}

/// Travel time between two places
pub async fn handle_travel(
    from: String,
    to: String,
    mode: TravelMode,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (_database, ctx) = open_context(config).await?;
    let estimate = ctx
        .travel
        .estimate(TravelTimeRequest::new(from.clone(), to.clone(), mode))
        .await?;

    match format {
        OutputFormat::Text => {
            println!(
                "{} -> {} by {}: {} min ({:?})",
                from, to, mode, estimate.duration, estimate.source
            );
            if let Some(warning) = &estimate.warning {
                println!("Warning: {}", warning);
            }
            if let Some(error) = &estimate.error {
                println!("Error: {}", error);
            }
        }
        OutputFormat::Json => print_json(&estimate)?,
    }
    Ok(())
}

/// Directions API usage of this process
pub async fn handle_usage(config: &Config, format: OutputFormat) -> Result<()> {
    let (_database, ctx) = open_context(config).await?;
    let usage = ctx.travel.usage();

    match format {
        OutputFormat::Text => {
            println!("API calls used:      {}", usage.api_calls_used);
            println!("API calls remaining: {}", usage.api_calls_remaining);
            println!("Cached routes:       {}", usage.cache_size);
            println!("Counter reset:       {}", usage.reset_date.to_rfc3339());
        }
        OutputFormat::Json => print_json(&usage)?,
    }
    Ok(())
}

/// Shared free slots
pub async fn handle_availability(
    user_ids: Vec<String>,
    date: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (_database, ctx) = open_context(config).await?;
    let availability = ctx.team.availability(user_ids, date).await?;

    match format {
        OutputFormat::Text => {
            for (user, busy) in &availability.schedules {
                println!("{}: {} event(s)", user, busy.len());
                for slot in busy {
                    println!(
                        "  {} - {}  {}",
                        slot.start_time.with_timezone(&Local).format("%H:%M"),
                        slot.end_time.with_timezone(&Local).format("%H:%M"),
                        slot.title
                    );
                }
            }
            if availability.free_slots.is_empty() {
                println!("No shared free slot between 09:00 and 18:00");
            } else {
                println!("Free:");
                for slot in &availability.free_slots {
                    println!(
                        "  {} - {}",
                        slot.start.with_timezone(&Local).format("%H:%M"),
                        slot.end.with_timezone(&Local).format("%H:%M")
                    );
                }
            }
        }
        OutputFormat::Json => print_json(&availability)?,
    }
    Ok(())
}

/// Today's briefing
pub async fn handle_briefing(
    user: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (_database, ctx) = open_context(config).await?;
    let briefing = ctx.assistant.briefing(user).await?;

    match format {
        OutputFormat::Text => println!("{}", briefing.briefing),
        OutputFormat::Json => print_json(&briefing)?,
    }
    Ok(())
}

/// List one category
pub async fn handle_list(category: String, config: &Config, format: OutputFormat) -> Result<()> {
    let (_database, ctx) = open_context(config).await?;
    let listing = ctx.assistant.list(Some(category)).await?;

    match format {
        OutputFormat::Text => {
            let records = listing
                .as_object()
                .and_then(|o| o.values().find_map(Value::as_array))
                .cloned()
                .unwrap_or_default();
            if records.is_empty() {
                println!("Nothing here yet");
            }
            for record in &records {
                let label = ["title", "name", "destination", "type", "description", "content"]
                    .iter()
                    .find_map(|key| record.get(*key).and_then(Value::as_str))
                    .unwrap_or("-");
                println!("- {}", label);
            }
            if let Some(balance) = listing.get("balance").and_then(Value::as_f64) {
                println!("Balance: €{:.2}", balance);
            }
        }
        OutputFormat::Json => print_json(&listing)?,
    }
    Ok(())
}

/// What [`seed_demo_data`] inserted
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSummary {
    pub user_id: String,
    pub events: usize,
    pub transactions: usize,
    pub shopping_items: usize,
}

/// Insert a demo day for the default user: three events around `now`'s
/// local date, rent, groceries and salary, and a short shopping list.
pub async fn seed_demo_data(
    database: &Database,
    user: &UserConfig,
    now: DateTime<Utc>,
) -> Result<SeedSummary> {
    let user = database
        .users()
        .ensure(&user.default_id, &user.default_email, Some(&user.default_name))
        .await?;

    let at = |hhmm: &str| time_of_day_in(hhmm, now, &Local).unwrap_or(now);
    let events = [
        ("Team Meeting", "10:00", "11:00", "Office"),
        ("Lunch with Daniel", "12:30", "13:30", "Vapiano"),
        ("Project Review", "15:00", "16:00", "Zoom"),
    ];
    for (title, start, end, location) in events {
        database
            .events()
            .create(
                &user.id,
                NewEvent::new(title, at(start), at(end)).with_location(location),
            )
            .await?;
    }

    let transactions = [
        (1200.0, TransactionKind::Expense, "Rent", "Monthly Rent"),
        (45.90, TransactionKind::Expense, "Groceries", "Rewe"),
        (3500.0, TransactionKind::Income, "Salary", "Monthly Salary"),
    ];
    for (amount, kind, category, description) in transactions {
        database
            .transactions()
            .create(
                &user.id,
                NewTransaction {
                    kind,
                    category: category.to_string(),
                    description: Some(description.to_string()),
                    date: now,
                    is_paid: true,
                    ..NewTransaction::expense(amount)
                },
            )
            .await?;
    }

    let shopping = database.shopping();
    for name in ["Milk", "Coffee", "Bananas"] {
        shopping.create(&user.id, name, None).await?;
    }
    shopping.check_by_name(&user.id, "Coffee").await?;

    tracing::info!("Seeded demo data for {}", user.id);

    Ok(SeedSummary {
        user_id: user.id,
        events: events.len(),
        transactions: transactions.len(),
        shopping_items: 3,
    })
}

pub async fn handle_seed(config: &Config, format: OutputFormat) -> Result<()> {
    let database = open_database(config).await?;
    let summary = seed_demo_data(&database, &config.user, Utc::now()).await?;

    match format {
        OutputFormat::Text => {
            println!("User created: {}", summary.user_id);
            println!("Events created: {}", summary.events);
            println!("Transactions created: {}", summary.transactions);
            println!("Shopping items created: {}", summary.shopping_items);
        }
        OutputFormat::Json => print_json(&json!(summary))?,
    }

    database.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seed_demo_data() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(&dir.path().join("seed.db")).await.unwrap();
        let user = UserConfig::default();

        let summary = seed_demo_data(&database, &user, Utc::now()).await.unwrap();
        assert_eq!(summary.user_id, user.default_id);

        let events = database.events().list(&user.default_id).await.unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Team Meeting", "Lunch with Daniel", "Project Review"]);
        assert!(events.iter().all(|e| e.end_time > e.start_time));

        let transactions = database.transactions().list(&user.default_id).await.unwrap();
        assert_eq!(transactions.len(), 3);
        assert_eq!(
            transactions
                .iter()
                .filter(|t| t.kind == TransactionKind::Income)
                .count(),
            1
        );

        let open: Vec<_> = database
            .shopping()
            .list_unchecked(&user.default_id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(open, vec!["Milk", "Bananas"]);
    }

    #[test]
    fn test_version_string_has_commit() {
        assert!(version_string().starts_with(env!("CARGO_PKG_VERSION")));
        assert!(version_string().ends_with(')'));
    }
}
