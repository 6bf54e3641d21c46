//! Feed aggregator: users register RSS feeds, follow them, and a poll loop
//! ingests new items as posts.
//!
//! - [`feed`] - fetching, decoding and date normalization
//! - [`poller`] - one claim → mark → fetch → ingest cycle
//! - [`scheduler`] - the periodic loop around [`poller::poll_once`]
//! - [`storage`] - SQLite persistence
//! - [`config`] - `~/.config/gator/config.toml`

pub mod config;
pub mod feed;
pub mod poller;
pub mod scheduler;
pub mod shutdown;
pub mod storage;
pub mod util;
