use chrono::Utc;

use super::schema::Database;
use super::types::{DatabaseError, User};
use crate::util::clean_name;

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Register a user.
    ///
    /// The name is stripped of control characters and trimmed first.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::InvalidInput` if nothing printable is left of the name
    /// - `DatabaseError::AlreadyExists` if the name is taken
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let name = clean_name(name)
            .ok_or_else(|| DatabaseError::InvalidInput("user name cannot be empty".into()))?;
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4(),
            name,
            created_at: now,
            updated_at: now,
        };

        sqlx::query("INSERT INTO users (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(user.id)
            .bind(&user.name)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if DatabaseError::is_unique_violation(&e) {
                    DatabaseError::AlreadyExists(format!("user {}", user.name))
                } else {
                    DatabaseError::Other(e)
                }
            })?;

        Ok(user)
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = ?",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// All users, ordered by name
    pub async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Delete every user. Feeds, follows and posts go with them via
    /// `ON DELETE CASCADE`.
    ///
    /// Returns the number of users removed.
    pub async fn reset(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        tracing::info!(users = result.rows_affected(), "Database reset");
        Ok(result.rows_affected())
    }
}
