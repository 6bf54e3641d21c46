//! Feed retrieval and decoding.
//!
//! - [`fetcher`] - HTTP retrieval with a fixed timeout and `User-Agent`
//! - [`parser`] - RSS document decoding and HTML entity unescaping
//! - [`timestamp`] - publication date normalization
//!
//! Data flows fetcher → parser; the poller normalizes each item's date when
//! it stores the item.

mod fetcher;
mod parser;
mod timestamp;

pub use fetcher::{FetchError, Fetcher, FETCH_TIMEOUT, USER_AGENT};
pub use parser::{parse_document, Channel, ParseError, SyndicationDocument, SyndicationItem};
pub use timestamp::{normalize, Layout, TimestampError, LAYOUTS};
