use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{DatabaseError, NewPost, Post};

const POST_COLUMNS: &str =
    "p.id, p.title, p.url, p.description, p.published_at, p.feed_id, p.created_at, p.updated_at";

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Store a post.
    ///
    /// The post's link is its identity: a second insert with the same `url`
    /// is rejected whatever feed it comes from.
    ///
    /// # Errors
    ///
    /// - `DatabaseError::DuplicateLink` if a post with this URL already exists
    /// - `DatabaseError::Other` for any other storage failure, including an
    ///   unknown `feed_id`
    pub async fn insert_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        let now = Utc::now();
        let stored = Post {
            id: Uuid::new_v4(),
            title: post.title.clone(),
            url: post.url.clone(),
            description: post.description.clone(),
            published_at: post.published_at,
            feed_id: post.feed_id,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, url, description, published_at, feed_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(stored.id)
        .bind(&stored.title)
        .bind(&stored.url)
        .bind(&stored.description)
        .bind(stored.published_at)
        .bind(stored.feed_id)
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                DatabaseError::DuplicateLink(post.url.clone())
            } else {
                DatabaseError::Other(e)
            }
        })?;

        Ok(stored)
    }

    /// Most recent posts from the feeds `user_id` follows.
    ///
    /// Newest publication date first; posts without one sort last, by
    /// ingestion time.
    pub async fn posts_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN feed_follows ff ON ff.feed_id = p.feed_id
            WHERE ff.user_id = ?
            ORDER BY p.published_at IS NULL, p.published_at DESC, p.created_at DESC
            LIMIT ?
        "#
        ))
        .bind(user_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }

    /// All posts of one feed, in ingestion order
    pub async fn posts_for_feed(&self, feed_id: Uuid) -> Result<Vec<Post>, DatabaseError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            WHERE p.feed_id = ?
            ORDER BY p.created_at, p.id
        "#
        ))
        .bind(feed_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    fn new_post(feed_id: Uuid, url: &str, published_at: Option<DateTime<Utc>>) -> NewPost {
        NewPost {
            title: format!("Post at {url}"),
            url: url.to_string(),
            description: Some("body".into()),
            published_at,
            feed_id,
        }
    }

    async fn setup() -> (Database, Uuid, Uuid) {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.create_user("lane").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/feed", user.id)
            .await
            .unwrap();
        (db, user.id, feed.id)
    }

    #[tokio::test]
    async fn test_insert_post_roundtrip() {
        let (db, _, feed_id) = setup().await;

        let post = db
            .insert_post(&new_post(feed_id, "https://example.com/a", at(1_136_239_445)))
            .await
            .unwrap();

        let stored = db.posts_for_feed(feed_id).await.unwrap();
        assert_eq!(stored, vec![post]);
    }

    #[tokio::test]
    async fn test_duplicate_link_is_tagged() {
        let (db, user_id, feed_id) = setup().await;
        let other_feed = db
            .create_feed("Mirror", "https://mirror.example.com/feed", user_id)
            .await
            .unwrap();

        db.insert_post(&new_post(feed_id, "https://example.com/a", None))
            .await
            .unwrap();
        let result = db
            .insert_post(&new_post(other_feed.id, "https://example.com/a", None))
            .await;

        match result {
            Err(DatabaseError::DuplicateLink(url)) => assert_eq!(url, "https://example.com/a"),
            other => panic!("Expected DuplicateLink, got {:?}", other),
        }
        assert!(db.posts_for_feed(other_feed.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_post_unknown_feed() {
        let (db, _, _) = setup().await;
        let result = db
            .insert_post(&new_post(Uuid::new_v4(), "https://example.com/a", None))
            .await;
        assert!(matches!(result, Err(DatabaseError::Other(_))));
    }

    #[tokio::test]
    async fn test_posts_for_user_newest_first() {
        let (db, user_id, feed_id) = setup().await;
        db.insert_post(&new_post(feed_id, "https://example.com/old", at(1_000)))
            .await
            .unwrap();
        db.insert_post(&new_post(feed_id, "https://example.com/undated", None))
            .await
            .unwrap();
        db.insert_post(&new_post(feed_id, "https://example.com/new", at(2_000)))
            .await
            .unwrap();

        let urls: Vec<String> = db
            .posts_for_user(user_id, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/new",
                "https://example.com/old",
                "https://example.com/undated",
            ]
        );

        assert_eq!(db.posts_for_user(user_id, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_posts_for_user_only_followed() {
        let (db, _, feed_id) = setup().await;
        let stranger = db.create_user("allan").await.unwrap();
        db.insert_post(&new_post(feed_id, "https://example.com/a", None))
            .await
            .unwrap();

        assert!(db.posts_for_user(stranger.id, 10).await.unwrap().is_empty());
    }
}
