//! Dispatch of classifications to the category handlers

use super::handlers::{self, HandlerContext};
use crate::config::UserConfig;
use crate::db::{stored, Database};
use crate::travel::TravelTimeSource;
use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use sdk::types::{Category, ExecuteRequest, ExecuteResponse};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

fn storage_error(err: anyhow::Error) -> EngineError {
    error!("Storage failure: {:#}", err);
    EngineError::Database(format!("{:#}", err))
}

pub struct Executor {
    db: Database,
    travel: Arc<dyn TravelTimeSource>,
    user: UserConfig,
}

impl Executor {
    pub fn new(db: Database, travel: Arc<dyn TravelTimeSource>, user: UserConfig) -> Self {
        Self { db, travel, user }
    }

    /// The acting user, created on first use
    pub async fn default_user_id(&self) -> Result<String, EngineError> {
        let user = self
            .db
            .users()
            .ensure(
                &self.user.default_id,
                &self.user.default_email,
                Some(&self.user.default_name),
            )
            .await
            .map_err(storage_error)?;
        Ok(user.id)
    }

    pub async fn execute(&self, request: ExecuteRequest) -> Result<ExecuteResponse, EngineError> {
        self.execute_at(request, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        request: ExecuteRequest,
        now: DateTime<Utc>,
    ) -> Result<ExecuteResponse, EngineError> {
        let classification = request
            .classification
            .ok_or_else(|| EngineError::InvalidRequest("No classification provided".to_string()))?;

        let category: Category = classification
            .category
            .parse()
            .map_err(EngineError::UnknownCategory)?;

        debug!(
            "Executing {}/{} (force: {})",
            category, classification.action, request.force
        );

        let ctx = HandlerContext {
            db: self.db.clone(),
            user_id: self.default_user_id().await?,
            travel: Arc::clone(&self.travel),
            force: request.force,
            now: stored(now),
        };

        let action = classification.action.trim().to_lowercase();
        let data = &classification.data;

        let result = match category {
            Category::Calendar => handlers::calendar::handle(&ctx, &action, data).await,
            Category::Finance => handlers::finance::handle(&ctx, &action, data).await,
            Category::Shopping => handlers::shopping::handle(&ctx, &action, data).await,
            Category::Health => handlers::health::handle(&ctx, &action, data).await,
            Category::Notes => handlers::notes::handle(&ctx, &action, data).await,
            Category::Travel => handlers::travel::handle(&ctx, &action, data).await,
            Category::Journal => handlers::journal::handle(&ctx, &action, data).await,
        }
        .map_err(storage_error)?;

        Ok(ExecuteResponse {
            success: true,
            category: classification.category,
            action: classification.action,
            result,
        })
    }

    /// Every record of the default user for one category
    pub async fn list(&self, category: Option<&str>) -> Result<Value, EngineError> {
        let user = self
            .db
            .users()
            .find_by_email(&self.user.default_email)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| EngineError::NotFound("User".to_string()))?;

        let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(json!({ "message": "Specify a category" }));
        };
        let category: Category = category.parse().map_err(EngineError::UnknownCategory)?;

        let id = user.id.as_str();
        let listing = match category {
            Category::Calendar => self
                .db
                .events()
                .list(id)
                .await
                .map(|events| json!({ "events": events })),
            Category::Finance => self
                .db
                .transactions()
                .list(id)
                .await
                .map(|transactions| {
                    json!({ "transactions": transactions, "balance": user.current_balance })
                }),
            Category::Shopping => self
                .db
                .shopping()
                .list(id)
                .await
                .map(|items| json!({ "items": items })),
            Category::Health => self
                .db
                .health()
                .list(id)
                .await
                .map(|logs| json!({ "logs": logs })),
            Category::Notes => self
                .db
                .notes()
                .list(id)
                .await
                .map(|notes| json!({ "notes": notes })),
            Category::Travel => self
                .db
                .trips()
                .list(id)
                .await
                .map(|trips| json!({ "trips": trips })),
            Category::Journal => self
                .db
                .journal()
                .list(id)
                .await
                .map(|journals| json!({ "journals": journals })),
        };

        listing.map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::conflicts::testing::FixedTravel;
    use chrono::Timelike;
    use sdk::errors::MibuErrorExt;
    use sdk::types::Classification;
    use tempfile::TempDir;

    async fn executor() -> (TempDir, Executor) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("test.db")).await.unwrap();
        let executor = Executor::new(db, Arc::new(FixedTravel::new(15)), UserConfig::default());
        (dir, executor)
    }

    fn request(category: &str, action: &str, data: Value) -> ExecuteRequest {
        ExecuteRequest {
            classification: Some(Classification::new(category, action, data)),
            force: false,
        }
    }

    #[tokio::test]
    async fn test_missing_classification() {
        let (_dir, ex) = executor().await;
        let err = ex.execute(ExecuteRequest::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "No classification provided");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_unknown_category() {
        let (_dir, ex) = executor().await;
        let err = ex
            .execute(request("home", "create", json!({"device": "lights"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown category");
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_execute_echoes_category_and_action() {
        let (_dir, ex) = executor().await;
        let out = ex
            .execute(request("Notes", "create", json!({"title": "Idea"})))
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.category, "Notes");
        assert_eq!(out.action, "create");
        assert_eq!(out.result["note"]["userId"], "mock-user-1");
    }

    #[tokio::test]
    async fn test_list_requires_user_then_category() {
        let (_dir, ex) = executor().await;
        let err = ex.list(Some("notes")).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");
        assert_eq!(err.status_code(), 404);

        ex.default_user_id().await.unwrap();
        assert_eq!(
            ex.list(None).await.unwrap(),
            json!({"message": "Specify a category"})
        );
        assert_eq!(ex.list(Some("home")).await.unwrap_err().status_code(), 400);
    }

    #[tokio::test]
    async fn test_created_records_match_listing() {
        let (_dir, ex) = executor().await;
        let now = Utc::now().with_nanosecond(123_456_789).unwrap();

        let event = ex
            .execute_at(request("calendar", "create", json!({"title": "Call"})), now)
            .await
            .unwrap();
        let note = ex
            .execute_at(request("notes", "create", json!({"title": "Idea"})), now)
            .await
            .unwrap();
        let item = ex
            .execute_at(request("shopping", "create", json!({"name": "Milk"})), now)
            .await
            .unwrap();

        let events = ex.list(Some("calendar")).await.unwrap();
        assert_eq!(events["events"][0], event.result["event"]);
        assert!(event.result["event"]["startTime"]
            .as_str()
            .unwrap()
            .contains(".123Z"));

        let notes = ex.list(Some("notes")).await.unwrap();
        assert_eq!(notes["notes"][0], note.result["note"]);

        let items = ex.list(Some("shopping")).await.unwrap();
        assert_eq!(items["items"][0], item.result["added"][0]);
    }

    #[tokio::test]
    async fn test_list_finance_includes_balance() {
        let (_dir, ex) = executor().await;
        ex.execute(request("finance", "set", json!({"balance": 250})))
            .await
            .unwrap();
        ex.execute(request("finance", "create", json!({"amount": 12})))
            .await
            .unwrap();

        let listing = ex.list(Some("finance")).await.unwrap();
        assert_eq!(listing["balance"], 250.0);
        assert_eq!(listing["transactions"].as_array().unwrap().len(), 1);
    }
}
