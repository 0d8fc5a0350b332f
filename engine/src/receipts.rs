//! Receipt photo to structured fields via a vision model

use crate::assistant::datetime::parse_datetime_in;
use crate::config::UserConfig;
use crate::db::{Database, NewTransaction};
use crate::llm::{extract_json_object, CompletionOptions, LLMProvider, Message};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{Local, Utc};
use sdk::errors::EngineError;
use sdk::types::{ReceiptAnalysis, ReceiptOutcome, Upload};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const RECEIPT_PROMPT: &str = "Analyze this receipt. Extract the merchant name, date, total amount, \
and a list of items purchased. Return ONLY a JSON object with this structure: \
{ merchant: string, date: string (ISO), total: number, items: [{ name: string, price: number }] }";

pub struct ReceiptService {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f64,
    db: Database,
    user: UserConfig,
}

/// `data:` URL for an uploaded image
pub fn data_url(image: &Upload) -> String {
    let content_type = image.content_type.as_deref().unwrap_or("image/jpeg");
    format!("data:{};base64,{}", content_type, STANDARD.encode(&image.bytes))
}

impl ReceiptService {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        temperature: f64,
        db: Database,
        user: UserConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            db,
            user,
        }
    }

    pub async fn analyze(&self, image: Upload, save: bool) -> Result<ReceiptOutcome, EngineError> {
        if image.bytes.is_empty() {
            return Err(EngineError::InvalidRequest("No file provided".to_string()));
        }
        debug!(
            "Analyzing receipt {} ({} bytes)",
            image.file_name.as_deref().unwrap_or("<unnamed>"),
            image.bytes.len()
        );

        let messages = [Message::user_with_image(RECEIPT_PROMPT, data_url(&image))];
        let options = CompletionOptions::with_temperature(self.temperature).model(self.model.clone());
        let raw = self.provider.complete(&messages, &options).await?;

        let data: ReceiptAnalysis = extract_json_object(&raw)
            .and_then(|v| serde_json::from_value(v).ok())
            .ok_or_else(|| {
                warn!("Failed to parse receipt response: {}", raw);
                EngineError::parse_with_raw("Failed to parse AI response", raw.clone())
            })?;

        let transaction = if save {
            self.save_expense(&data).await?
        } else {
            None
        };

        Ok(ReceiptOutcome {
            success: true,
            data,
            transaction,
        })
    }

    async fn save_expense(
        &self,
        data: &ReceiptAnalysis,
    ) -> Result<Option<sdk::types::Transaction>, EngineError> {
        let Some(total) = data.total.filter(|t| *t > 0.0) else {
            warn!("Receipt has no total, nothing saved");
            return Ok(None);
        };

        let storage = |e: anyhow::Error| EngineError::Database(format!("{:#}", e));
        let user = self
            .db
            .users()
            .ensure(
                &self.user.default_id,
                &self.user.default_email,
                Some(&self.user.default_name),
            )
            .await
            .map_err(storage)?;

        let mut tx = NewTransaction::expense(total);
        tx.category = "Groceries".to_string();
        tx.description = data.merchant.clone();
        tx.is_paid = true;
        tx.date = data
            .date
            .as_ref()
            .and_then(|d| parse_datetime_in(&Value::String(d.clone()), &Local))
            .unwrap_or_else(Utc::now);

        let saved = self
            .db
            .transactions()
            .create(&user.id, tx)
            .await
            .map_err(storage)?;
        info!("Saved receipt expense of {:.2} ({})", saved.amount, saved.id);

        Ok(Some(saved))
    }
}
