use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Storage errors.
///
/// `NoFeedsRegistered` and `DuplicateLink` are expected outcomes that callers
/// match on; everything the engine reports that has no dedicated variant
/// lands in `Other`.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The feeds table is empty, so there is nothing to claim
    #[error("No feeds registered")]
    NoFeedsRegistered,

    /// A post with this link is already stored
    #[error("A post with link {0} already exists")]
    DuplicateLink(String),

    /// A user name, feed URL or follow that must be unique already exists
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// A name was empty once control characters and whitespace were removed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The referenced row does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Whether `err` is a UNIQUE constraint violation.
    pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
    }
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A registered feed.
///
/// `last_fetched_at` is `None` until the poller first claims the feed and
/// never moves backwards afterwards.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// Feed row joined with its owner's name, for listings
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedListing {
    pub name: String,
    pub url: String,
    pub owner: String,
}

/// A stored entry. `url` is unique across all feeds.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post fields produced by ingestion; storage assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub feed_id: Uuid,
}
