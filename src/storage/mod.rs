//! SQLite storage for users, feeds, follows and posts.
//!
//! All operations are methods on [`Database`], grouped by table:
//!
//! - `users` - registration, lookup, reset
//! - `feeds` - registration, listing, and the poll claim/mark pair
//! - `follows` - subscription bookkeeping
//! - `posts` - ingestion target, keyed by link

mod feeds;
mod follows;
mod posts;
mod schema;
mod types;
mod users;

pub use schema::Database;
pub use types::{DatabaseError, Feed, FeedListing, NewPost, Post, User};
