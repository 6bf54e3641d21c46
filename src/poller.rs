//! One poll cycle: claim the most overdue feed, mark it, fetch it, ingest
//! its items.
//!
//! The cycle talks to storage and the network only through [`FeedStore`] and
//! [`FeedSource`], so it runs the same against SQLite and reqwest as against
//! the in-memory fakes in the tests below.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::feed::{normalize, FetchError, SyndicationDocument, SyndicationItem};
use crate::shutdown::Shutdown;
use crate::storage::{Database, DatabaseError, Feed, NewPost, Post};

// ============================================================================
// Collaborators
// ============================================================================

/// Storage operations a poll cycle needs.
pub trait FeedStore: Send + Sync {
    /// Feed with the oldest `last_fetched_at`, never-fetched feeds first.
    /// Fails with [`DatabaseError::NoFeedsRegistered`] on an empty table.
    fn claim_next_feed_due(&self) -> impl Future<Output = Result<Feed, DatabaseError>> + Send;

    /// Set `last_fetched_at`, never moving it backwards.
    fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    /// Store a post. Fails with [`DatabaseError::DuplicateLink`] when the
    /// link is already stored.
    fn insert_post(
        &self,
        post: &NewPost,
    ) -> impl Future<Output = Result<Post, DatabaseError>> + Send;
}

/// Retrieves and decodes a feed document.
pub trait FeedSource: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        shutdown: &Shutdown,
    ) -> impl Future<Output = Result<SyndicationDocument, FetchError>> + Send;
}

impl<T: FeedStore> FeedStore for &T {
    fn claim_next_feed_due(&self) -> impl Future<Output = Result<Feed, DatabaseError>> + Send {
        (**self).claim_next_feed_due()
    }

    fn mark_feed_fetched(
        &self,
        feed_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send {
        (**self).mark_feed_fetched(feed_id, at)
    }

    fn insert_post(
        &self,
        post: &NewPost,
    ) -> impl Future<Output = Result<Post, DatabaseError>> + Send {
        (**self).insert_post(post)
    }
}

impl<T: FeedSource> FeedSource for &T {
    fn fetch(
        &self,
        url: &str,
        shutdown: &Shutdown,
    ) -> impl Future<Output = Result<SyndicationDocument, FetchError>> + Send {
        (**self).fetch(url, shutdown)
    }
}

impl FeedStore for Database {
    async fn claim_next_feed_due(&self) -> Result<Feed, DatabaseError> {
        Database::claim_next_feed_due(self).await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
        Database::mark_feed_fetched(self, feed_id, at).await
    }

    async fn insert_post(&self, post: &NewPost) -> Result<Post, DatabaseError> {
        Database::insert_post(self, post).await
    }
}

// ============================================================================
// Cycle
// ============================================================================

/// Cycle-level failures. Item-level problems never show up here; they are
/// counted in [`CycleReport`] instead.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("No feeds registered")]
    NoFeedsRegistered,

    #[error(transparent)]
    Storage(DatabaseError),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
}

impl From<DatabaseError> for PollError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NoFeedsRegistered => PollError::NoFeedsRegistered,
            other => PollError::Storage(other),
        }
    }
}

/// What one cycle did with the claimed feed's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub feed_id: Uuid,
    pub feed_url: String,
    /// Items in the fetched document
    pub seen: usize,
    pub inserted: usize,
    /// Items whose link was already stored
    pub duplicates: usize,
    /// Items with no link or an unparseable `pubDate`
    pub skipped: usize,
    /// Items whose insert failed for any other reason
    pub failed: usize,
    /// Shutdown fired before every item was processed
    pub interrupted: bool,
}

impl CycleReport {
    fn new(feed: &Feed) -> Self {
        Self {
            feed_id: feed.id,
            feed_url: feed.url.clone(),
            seen: 0,
            inserted: 0,
            duplicates: 0,
            skipped: 0,
            failed: 0,
            interrupted: false,
        }
    }
}

enum ItemOutcome {
    Inserted,
    Duplicate,
    Skipped,
    Failed,
}

/// Run one poll cycle.
///
/// The feed is marked fetched *before* the network request, so a feed that
/// hangs or always fails still rotates to the back of the queue.
///
/// # Errors
///
/// - [`PollError::NoFeedsRegistered`] - nothing to claim
/// - [`PollError::Storage`] - claim or mark failed
/// - [`PollError::Fetch`] - the document could not be retrieved or decoded
pub async fn poll_once<S, F>(
    store: &S,
    source: &F,
    shutdown: &Shutdown,
) -> Result<CycleReport, PollError>
where
    S: FeedStore,
    F: FeedSource,
{
    let feed = store.claim_next_feed_due().await?;
    store.mark_feed_fetched(feed.id, Utc::now()).await?;

    tracing::debug!(feed = %feed.url, name = %feed.name, "Fetching feed");
    let document = source
        .fetch(&feed.url, shutdown)
        .await
        .map_err(|source| PollError::Fetch {
            url: feed.url.clone(),
            source,
        })?;

    let mut report = CycleReport::new(&feed);
    report.seen = document.channel.items.len();

    for item in document.channel.items {
        if shutdown.is_triggered() {
            report.interrupted = true;
            break;
        }
        match ingest_item(store, &feed, item).await {
            ItemOutcome::Inserted => report.inserted += 1,
            ItemOutcome::Duplicate => report.duplicates += 1,
            ItemOutcome::Skipped => report.skipped += 1,
            ItemOutcome::Failed => report.failed += 1,
        }
    }

    tracing::info!(
        feed = %feed.url,
        seen = report.seen,
        inserted = report.inserted,
        duplicates = report.duplicates,
        skipped = report.skipped,
        failed = report.failed,
        "Feed polled"
    );
    Ok(report)
}

async fn ingest_item<S: FeedStore>(store: &S, feed: &Feed, item: SyndicationItem) -> ItemOutcome {
    let url = item.link.trim();
    if url.is_empty() {
        tracing::debug!(feed = %feed.url, title = %item.title, "Skipping item without link");
        return ItemOutcome::Skipped;
    }

    // Missing, blank and unreadable dates all drop the item.
    let published_at = match normalize(&item.pub_date) {
        Ok(instant) => instant.with_timezone(&Utc),
        Err(e) => {
            tracing::debug!(feed = %feed.url, item = %url, error = %e, "Skipping item");
            return ItemOutcome::Skipped;
        }
    };

    let post = NewPost {
        title: item.title,
        url: url.to_string(),
        description: Some(item.description).filter(|d| !d.trim().is_empty()),
        published_at: Some(published_at),
        feed_id: feed.id,
    };

    match store.insert_post(&post).await {
        Ok(_) => ItemOutcome::Inserted,
        Err(DatabaseError::DuplicateLink(_)) => {
            tracing::debug!(item = %post.url, "Post already stored");
            ItemOutcome::Duplicate
        }
        Err(e) => {
            tracing::warn!(feed = %feed.url, item = %post.url, error = %e, "Failed to store post");
            ItemOutcome::Failed
        }
    }
}
