use crate::feed::parser::{parse_document, ParseError, SyndicationDocument};
use crate::poller::FeedSource;
use crate::shutdown::Shutdown;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on a single feed request, body included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// `User-Agent` sent with every feed request.
pub const USER_AGENT: &str = "gator";

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching a feed.
///
/// Every variant is fatal to the current poll cycle only; the next tick
/// retries naturally.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// Request exceeded the fetch timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not a decodable RSS document
    #[error(transparent)]
    Malformed(#[from] ParseError),
    /// Shutdown fired while the request was in flight
    #[error("Fetch cancelled by shutdown")]
    Cancelled,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}

/// HTTP feed fetcher with a fixed timeout and client identifier.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Fetcher {
    /// Fetcher using [`FETCH_TIMEOUT`].
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Transport)?;
        Ok(Self { client, timeout })
    }

    /// Fetches `url` and decodes the body as an RSS document.
    ///
    /// The request is abandoned with [`FetchError::Cancelled`] as soon as
    /// `shutdown` fires.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Timeout`] - the request took longer than the timeout
    /// - [`FetchError::Transport`] - connection, DNS or TLS failure
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::ResponseTooLarge`] - body over 10MB
    /// - [`FetchError::Malformed`] - body is not an RSS document
    /// - [`FetchError::Cancelled`] - shutdown fired first
    pub async fn fetch_document(
        &self,
        url: &str,
        shutdown: &Shutdown,
    ) -> Result<SyndicationDocument, FetchError> {
        let request = async {
            let bytes = tokio::time::timeout(self.timeout, self.fetch_bytes(url))
                .await
                .map_err(|_| FetchError::Timeout)??;
            Ok::<_, FetchError>(parse_document(&bytes)?)
        };

        tokio::select! {
            biased;

            _ = shutdown.triggered() => {
                tracing::debug!(feed = %url, "Fetch cancelled by shutdown");
                Err(FetchError::Cancelled)
            }
            result = request => result,
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

impl FeedSource for Fetcher {
    async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<SyndicationDocument, FetchError> {
        self.fetch_document(url, shutdown).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
