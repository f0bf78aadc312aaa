// Shared trait + error for quote sources

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::types::{Pair, Quote, Venue};

#[cfg(test)]
pub mod fixed;
pub mod kraken;
pub mod kraken_types;
pub mod okx;
pub mod okx_types;

/// Any failure to obtain a usable quote. Always transient from the loop's
/// point of view: the cycle is skipped and the next one runs.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("request to {venue} failed: {source}")]
    Transport {
        venue: Venue,
        #[source]
        source: reqwest::Error,
    },
    #[error("{venue} answered HTTP {status}")]
    Status { venue: Venue, status: reqwest::StatusCode },
    #[error("{venue} API error: {message}")]
    Api { venue: Venue, message: String },
    #[error("malformed {venue} ticker: {reason}")]
    Malformed { venue: Venue, reason: String },
    #[error("{venue} did not answer within {timeout:?}")]
    Timeout { venue: Venue, timeout: Duration },
}

impl QuoteError {
    pub fn venue(&self) -> &Venue {
        match self {
            QuoteError::Transport { venue, .. }
            | QuoteError::Status { venue, .. }
            | QuoteError::Api { venue, .. }
            | QuoteError::Malformed { venue, .. }
            | QuoteError::Timeout { venue, .. } => venue,
        }
    }

    /// A malformed payload will not fix itself on retry; everything else might.
    pub fn is_retryable(&self) -> bool {
        match self {
            QuoteError::Status { status, .. } => status.is_server_error() || status.as_u16() == 429,
            QuoteError::Malformed { .. } => false,
            _ => true,
        }
    }

    pub(crate) fn transport(venue: &Venue, source: reqwest::Error) -> Self {
        QuoteError::Transport { venue: venue.clone(), source }
    }
}

/// Static exchange credentials. The public ticker endpoints do not need them;
/// they are carried so a source knows it is configured for the account.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("key", &"***")
            .field("secret", &"***")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    fn venue(&self) -> &Venue;

    /// Best bid/ask for `pair` right now.
    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote, QuoteError>;
}

/// HTTP client shared by the REST sources.
pub fn http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("arbx-rs/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
}

// GET `url` and return the body, mapping transport and status failures.
pub(crate) async fn get_text(
    client: &reqwest::Client,
    venue: &Venue,
    url: &str,
    query: &[(&str, &str)],
) -> Result<String, QuoteError> {
    let res = client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| QuoteError::transport(venue, e))?;

    let status = res.status();
    if !status.is_success() {
        return Err(QuoteError::Status { venue: venue.clone(), status });
    }
    res.text().await.map_err(|e| QuoteError::transport(venue, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        let venue = Venue::new("okx");
        let status = |code| QuoteError::Status {
            venue: venue.clone(),
            status: reqwest::StatusCode::from_u16(code).unwrap(),
        };
        assert!(status(502).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!QuoteError::Malformed { venue: venue.clone(), reason: "x".into() }.is_retryable());
        let timeout = QuoteError::Timeout { venue: venue.clone(), timeout: Duration::from_secs(1) };
        assert!(timeout.is_retryable());
        assert_eq!(status(500).venue(), &venue);
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = ApiCredentials {
            key: "k3y".into(),
            secret: "s3cret".into(),
            passphrase: Some("pw".into()),
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("k3y"));
        assert!(!shown.contains("s3cret"));
        assert!(!shown.contains("pw\""));
    }
}
