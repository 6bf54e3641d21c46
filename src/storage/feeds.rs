use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::schema::Database;
use super::types::{DatabaseError, Feed, FeedListing};
use crate::util::clean_name;

const FEED_COLUMNS: &str = "id, name, url, user_id, created_at, updated_at, last_fetched_at";

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed owned by `user_id` and make the owner follow it.
    ///
    /// Both rows are written in one transaction. The display name is cleaned
    /// the same way user names are.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::InvalidInput` if the name is blank
    /// - `DatabaseError::AlreadyExists` if a feed with this URL is registered
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> Result<Feed, DatabaseError> {
        let name = clean_name(name)
            .ok_or_else(|| DatabaseError::InvalidInput("feed name cannot be empty".into()))?;
        let now = Utc::now();
        let feed = Feed {
            id: Uuid::new_v4(),
            name,
            url: url.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            last_fetched_at: None,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO feeds (id, name, url, user_id, created_at, updated_at, last_fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, NULL)
        "#,
        )
        .bind(feed.id)
        .bind(&feed.name)
        .bind(&feed.url)
        .bind(feed.user_id)
        .bind(feed.created_at)
        .bind(feed.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                DatabaseError::AlreadyExists(format!("feed {}", url))
            } else {
                DatabaseError::Other(e)
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO feed_follows (id, user_id, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(feed.id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(feed)
    }

    /// Look up a feed by its source URL
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// All feeds with their owner's name, ordered by feed name
    pub async fn list_feeds(&self) -> Result<Vec<FeedListing>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedListing>(
            r#"
            SELECT f.name, f.url, u.name AS owner
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.name, f.url
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    // ========================================================================
    // Poll Claim Operations
    // ========================================================================

    /// Select the feed most overdue for polling.
    ///
    /// Feeds never fetched come first, then the oldest `last_fetched_at`;
    /// ties are broken by id so the choice is reproducible. This only reads:
    /// the caller marks the feed with [`Database::mark_feed_fetched`] right
    /// after. Running several pollers would need both steps folded into one
    /// `UPDATE ... RETURNING` statement.
    ///
    /// # Errors
    ///
    /// `DatabaseError::NoFeedsRegistered` when the feeds table is empty.
    pub async fn claim_next_feed_due(&self) -> Result<Feed, DatabaseError> {
        sqlx::query_as::<_, Feed>(&format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM feeds
            ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC
            LIMIT 1
        "#
        ))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::NoFeedsRegistered)
    }

    /// Record that `feed_id` was fetched at `at`.
    ///
    /// An `at` older than the stored value leaves it unchanged, keeping
    /// `last_fetched_at` monotonic.
    ///
    /// # Errors
    ///
    /// `DatabaseError::NotFound` if the feed does not exist.
    pub async fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE feeds SET
                last_fetched_at = CASE
                    WHEN last_fetched_at IS NULL OR last_fetched_at < ?1 THEN ?1
                    ELSE last_fetched_at
                END,
                updated_at = ?2
            WHERE id = ?3
        "#,
        )
        .bind(at)
        .bind(Utc::now())
        .bind(feed_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("feed {}", feed_id)));
        }
        Ok(())
    }

    /// Fetch a feed by id
    pub async fn get_feed(&self, feed_id: Uuid) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?"
        ))
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }
}
