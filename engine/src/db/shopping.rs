/// Shopping list persistence
use super::{from_millis, new_id, stored, to_millis};
use anyhow::{Context, Result};
use chrono::Utc;
use sdk::types::ShoppingItem;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct ShoppingRepository {
    pool: SqlitePool,
}

impl ShoppingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        quantity: Option<&str>,
    ) -> Result<ShoppingItem> {
        let item = ShoppingItem {
            id: new_id(),
            name: name.to_string(),
            quantity: quantity.map(str::to_string),
            is_checked: false,
            user_id: user_id.to_string(),
            created_at: stored(Utc::now()),
        };

        sqlx::query(
            "INSERT INTO shopping_items (id, user_id, name, quantity, is_checked, created_at)
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(&item.id)
        .bind(&item.user_id)
        .bind(&item.name)
        .bind(&item.quantity)
        .bind(to_millis(item.created_at))
        .execute(&self.pool)
        .await
        .context("Failed to create shopping item")?;

        Ok(item)
    }

    /// Every item of a user, oldest first
    pub async fn list(&self, user_id: &str) -> Result<Vec<ShoppingItem>> {
        let rows =
            sqlx::query("SELECT * FROM shopping_items WHERE user_id = ? ORDER BY created_at ASC, rowid ASC")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to list shopping items")?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Items still to buy
    pub async fn list_unchecked(&self, user_id: &str) -> Result<Vec<ShoppingItem>> {
        let rows = sqlx::query(
            "SELECT * FROM shopping_items WHERE user_id = ? AND is_checked = 0 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list unchecked shopping items")?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Tick off unchecked items whose name matches case-insensitively.
    /// Returns how many rows changed.
    pub async fn check_by_name(&self, user_id: &str, name: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE shopping_items SET is_checked = 1
             WHERE user_id = ? AND is_checked = 0 AND lower(trim(name)) = lower(trim(?))",
        )
        .bind(user_id)
        .bind(name)
        .execute(&self.pool)
        .await
        .context("Failed to check shopping item")?;

        Ok(result.rows_affected())
    }
}

fn row_to_item(row: &SqliteRow) -> ShoppingItem {
    ShoppingItem {
        id: row.get("id"),
        name: row.get("name"),
        quantity: row.get("quantity"),
        is_checked: row.get("is_checked"),
        user_id: row.get("user_id"),
        created_at: from_millis(row.get("created_at")),
    }
}
