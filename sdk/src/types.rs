//! Wire types shared by the engine and the API server
//!
//! Everything here is serialized with camelCase field names because the
//! browser client consumes these shapes directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Record domains the executor can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Calendar,
    Finance,
    Shopping,
    Health,
    Notes,
    Travel,
    Journal,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Calendar,
        Category::Finance,
        Category::Shopping,
        Category::Health,
        Category::Notes,
        Category::Travel,
        Category::Journal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Calendar => "calendar",
            Category::Finance => "finance",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Notes => "notes",
            Category::Travel => "travel",
            Category::Journal => "journal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| s.to_string())
    }
}

/// Structured intent produced by the classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub category: String,

    #[serde(default, deserialize_with = "string_or_empty")]
    pub action: String,

    #[serde(default)]
    pub data: Value,

    /// Clarifying question when `category` is `question`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl Classification {
    pub fn new(category: impl Into<String>, action: impl Into<String>, data: Value) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            data,
            question: None,
        }
    }

    /// True when the model asked the user for more detail instead of classifying
    pub fn is_question(&self) -> bool {
        self.category.eq_ignore_ascii_case("question")
    }
}

/// Context of a pending clarifying question, sent back with the follow-up answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousContext {
    #[serde(default)]
    pub last_question: Option<String>,

    #[serde(default)]
    pub original_intent: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub previous_context: Option<PreviousContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub success: bool,
    pub classification: Classification,
    pub raw: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub classification: Option<Classification>,

    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    pub category: String,
    pub action: String,
    pub result: Value,
}

/// Account owning every record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub current_balance: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub is_all_day: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// Lenient parse; anything that is not `income` is an expense
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("income") {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_paid: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub quantity: Option<String>,
    pub is_checked: bool,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthLog {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub date: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub destination: String,
    pub origin: Option<String>,
    pub mode: TravelMode,
    pub duration_minutes: u32,
    pub departure_time: DateTime<Utc>,
    pub event_id: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub content: String,
    pub mood: String,
    pub sentiment_score: f64,
    pub tags: Vec<String>,
    pub date: DateTime<Utc>,
    pub user_id: String,
}

/// Travel mode understood by the directions service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
    #[default]
    Transit,
}

impl TravelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "driving" | "car" => Ok(TravelMode::Driving),
            "walking" | "walk" => Ok(TravelMode::Walking),
            "bicycling" | "bike" | "cycling" => Ok(TravelMode::Bicycling),
            "transit" | "public" => Ok(TravelMode::Transit),
            other => Err(format!("Unknown travel mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TravelTimeRequest {
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub to: Option<String>,

    #[serde(default)]
    pub mode: Option<TravelMode>,
}

impl TravelTimeRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, mode: TravelMode) -> Self {
        Self {
            from: Some(from.into()),
            to: Some(to.into()),
            mode: Some(mode),
        }
    }
}

/// Where a travel duration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelSource {
    Cache,
    Api,
    Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelTimeResponse {
    /// Travel time in minutes
    pub duration: u32,
    pub source: TravelSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_calls_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelUsage {
    pub api_calls_used: u32,
    pub api_calls_remaining: u32,
    pub cache_size: usize,
    pub reset_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    /// Kept loose so a non-array value can be rejected with a readable error
    #[serde(default)]
    pub user_ids: Option<Value>,

    #[serde(default)]
    pub date: Option<String>,
}

impl AvailabilityRequest {
    /// The requested user ids, or `None` when `userIds` is missing or not an array
    pub fn user_ids(&self) -> Option<Vec<String>> {
        let ids = self.user_ids.as_ref()?.as_array()?;
        Some(
            ids.iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }
}

/// One busy event in a user's schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusySlot {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub schedules: BTreeMap<String, Vec<BusySlot>>,
    pub free_slots: Vec<TimeSlot>,
}

/// Uploaded file from a multipart form
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            file_name: None,
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

/// Fields extracted from a receipt photo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiptAnalysis {
    #[serde(default)]
    pub merchant: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(default)]
    pub items: Vec<ReceiptItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptOutcome {
    pub success: bool,
    pub data: ReceiptAnalysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeakRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub success: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingContext {
    pub date: String,
    pub events: Vec<String>,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Briefing {
    pub briefing: String,
    pub context: BriefingContext,
}

/// Model answers sometimes carry `null` or a non-string where a label belongs
fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    })
}

/// A number or a numeric string; anything else reads as absent
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Calendar".parse::<Category>(), Ok(Category::Calendar));
        assert_eq!(" notes ".parse::<Category>(), Ok(Category::Notes));
        assert!("home".parse::<Category>().is_err());
        assert!("question".parse::<Category>().is_err());
    }

    #[test]
    fn test_classification_question_shape() {
        let c: Classification = serde_json::from_value(json!({
            "category": "question",
            "question": "Which cake?",
            "data": {"originalIntent": "shopping"}
        }))
        .unwrap();
        assert!(c.is_question());
        assert_eq!(c.action, "");
        assert_eq!(c.question.as_deref(), Some("Which cake?"));
    }

    #[test]
    fn test_classification_null_action_reads_as_empty() {
        let c: Classification = serde_json::from_value(json!({
            "category": "question",
            "action": null,
            "question": "When?",
            "data": {}
        }))
        .unwrap();
        assert!(c.is_question());
        assert_eq!(c.action, "");
    }

    #[test]
    fn test_receipt_amounts_accept_numeric_strings() {
        let r: ReceiptAnalysis = serde_json::from_value(json!({
            "merchant": "REWE",
            "total": "23,45",
            "items": [
                {"name": "Milch", "price": "1.19"},
                {"name": "Brot", "price": 2.5},
                {"name": "Pfand", "price": "n/a"}
            ]
        }))
        .unwrap();
        assert_eq!(r.total, Some(23.45));
        assert_eq!(r.items[0].price, Some(1.19));
        assert_eq!(r.items[1].price, Some(2.5));
        assert_eq!(r.items[2].price, None);
    }

    #[test]
    fn test_execute_request_force_defaults_false() {
        let req: ExecuteRequest =
            serde_json::from_value(json!({"classification": {"category": "notes"}})).unwrap();
        assert!(!req.force);
        assert_eq!(req.classification.unwrap().data, Value::Null);
    }

    #[test]
    fn test_availability_user_ids_requires_array() {
        let ok = AvailabilityRequest {
            user_ids: Some(json!(["a", "b"])),
            date: None,
        };
        assert_eq!(ok.user_ids(), Some(vec!["a".to_string(), "b".to_string()]));

        let bad = AvailabilityRequest {
            user_ids: Some(json!("a")),
            date: None,
        };
        assert_eq!(bad.user_ids(), None);
        assert_eq!(AvailabilityRequest::default().user_ids(), None);
    }

    #[test]
    fn test_travel_response_skips_empty_fields() {
        let resp = TravelTimeResponse {
            duration: 12,
            source: TravelSource::Cache,
            api_calls_remaining: Some(200),
            warning: None,
            error: None,
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"duration": 12, "source": "cache", "apiCallsRemaining": 200}));
    }

    #[test]
    fn test_transaction_kind_lenient() {
        assert_eq!(TransactionKind::parse_lenient("Income"), TransactionKind::Income);
        assert_eq!(TransactionKind::parse_lenient("bill"), TransactionKind::Expense);
    }
}
