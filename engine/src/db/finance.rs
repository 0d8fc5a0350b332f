/// Transaction persistence
use super::{from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sdk::types::{Transaction, TransactionKind};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub amount: f64,
    pub currency: String,
    pub kind: TransactionKind,
    pub category: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_paid: bool,
}

impl NewTransaction {
    /// An unpaid EUR expense in category `Other`, dated now
    pub fn expense(amount: f64) -> Self {
        Self {
            amount,
            currency: "EUR".to_string(),
            kind: TransactionKind::Expense,
            category: "Other".to_string(),
            description: None,
            date: Utc::now(),
            due_date: None,
            is_paid: false,
        }
    }
}

pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, tx: NewTransaction) -> Result<Transaction> {
        let tx = Transaction {
            id: new_id(),
            amount: tx.amount,
            currency: tx.currency,
            kind: tx.kind,
            category: tx.category,
            description: tx.description,
            date: stored(tx.date),
            due_date: tx.due_date.map(stored),
            is_paid: tx.is_paid,
            user_id: user_id.to_string(),
        };

        sqlx::query(
            "INSERT INTO transactions
             (id, user_id, amount, currency, kind, category, description, date, due_date, is_paid)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&tx.id)
        .bind(&tx.user_id)
        .bind(tx.amount)
        .bind(&tx.currency)
        .bind(tx.kind.as_str())
        .bind(&tx.category)
        .bind(&tx.description)
        .bind(to_millis(tx.date))
        .bind(tx.due_date.map(to_millis))
        .bind(tx.is_paid)
        .execute(&self.pool)
        .await
        .context("Failed to create transaction")?;

        Ok(tx)
    }

    /// All transactions of a user, newest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query("SELECT * FROM transactions WHERE user_id = ? ORDER BY date DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions")?;

        Ok(rows.iter().map(row_to_transaction).collect())
    }
}

fn row_to_transaction(row: &SqliteRow) -> Transaction {
    let kind: String = row.get("kind");
    let due_date: Option<i64> = row.get("due_date");

    Transaction {
        id: row.get("id"),
        amount: row.get("amount"),
        currency: row.get("currency"),
        kind: TransactionKind::parse_lenient(&kind),
        category: row.get("category"),
        description: row.get("description"),
        date: from_millis(row.get("date")),
        due_date: due_date.map(from_millis),
        is_paid: row.get("is_paid"),
        user_id: row.get("user_id"),
    }
}
