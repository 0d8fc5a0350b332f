/// User persistence operations
use super::{from_millis, to_millis};
use anyhow::{Context, Result};
use chrono::Utc;
use sdk::types::User;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the user with `id`, creating it on first use.
    ///
    /// When another user already owns `email` that user is returned instead,
    /// since email is unique.
    pub async fn ensure(&self, id: &str, email: &str, name: Option<&str>) -> Result<User> {
        sqlx::query(
            "INSERT OR IGNORE INTO users (id, email, name, current_balance, created_at)
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(id)
        .bind(email)
        .bind(name)
        .bind(to_millis(Utc::now()))
        .execute(&self.pool)
        .await
        .context("Failed to create user")?;

        if let Some(user) = self.get(id).await? {
            return Ok(user);
        }

        self.find_by_email(email)
            .await?
            .with_context(|| format!("User {} could not be created", id))
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to get user")?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to find user by email")?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    /// Overwrite the running balance. Returns false when the user is unknown.
    pub async fn set_balance(&self, id: &str, balance: f64) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET current_balance = ? WHERE id = ?")
            .bind(balance)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update balance")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        current_balance: row.get("current_balance"),
        created_at: from_millis(row.get("created_at")),
    }
}
