// Feed fetches both venues' quotes for one pair, each attempt under a timeout
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use rand::Rng;
use tracing::{instrument, warn};

use crate::engine::types::{Pair, Quote, Venue};
use crate::market_data::adapters::{QuoteError, QuoteSource};
use crate::telemetry::QUOTE_FAILURES_TOTAL;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// extra attempts after the first one
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, initial_backoff: Duration::from_millis(200) }
    }
}

pub struct QuoteFeed {
    first: Arc<dyn QuoteSource>,
    second: Arc<dyn QuoteSource>,
    pair: Pair,
    timeout: Duration,
    retry: RetryPolicy,
}

impl QuoteFeed {
    pub fn new(
        first: Arc<dyn QuoteSource>,
        second: Arc<dyn QuoteSource>,
        pair: Pair,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self { first, second, pair, timeout, retry }
    }

    pub fn pair(&self) -> &Pair {
        &self.pair
    }

    pub fn venues(&self) -> [&Venue; 2] {
        [self.first.venue(), self.second.venue()]
    }

    /// Fetch both quotes concurrently. Either failure fails the pair; every
    /// failed venue is counted before the first error is returned.
    #[instrument(level = "debug", skip(self), fields(pair = %self.pair))]
    pub async fn fetch_pair(&self) -> Result<(Quote, Quote), QuoteError> {
        let (a, b) = tokio::join!(
            self.fetch(self.first.as_ref()),
            self.fetch(self.second.as_ref())
        );
        let failed = failed_venues(&a, &b);
        for venue in &failed {
            counter!(QUOTE_FAILURES_TOTAL, "venue" => venue.name.clone()).increment(1);
        }
        if failed.len() > 1 {
            warn!(pair = %self.pair, venues = ?failed, "No quote from either venue");
        }
        Ok((a?, b?))
    }

    async fn fetch(&self, source: &dyn QuoteSource) -> Result<Quote, QuoteError> {
        let mut attempt: u32 = 0;
        let mut backoff = self.retry.initial_backoff;
        loop {
            let attempt_result =
                tokio::time::timeout(self.timeout, source.fetch_quote(&self.pair)).await;
            let result = match attempt_result {
                Ok(result) => result,
                Err(_) => Err(QuoteError::Timeout {
                    venue: source.venue().clone(),
                    timeout: self.timeout,
                }),
            };

            match result {
                Ok(quote) => return Ok(quote),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        venue = %source.venue(),
                        attempt,
                        max = self.retry.max_retries,
                        error = %e,
                        "Quote fetch failed, retrying"
                    );
                    tokio::time::sleep(backoff + jitter(backoff)).await;
                    backoff *= 2;
                }
                Err(e) => {
                    warn!(
                        venue = %source.venue(),
                        attempts = attempt + 1,
                        error = %e,
                        "Quote fetch failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}

fn failed_venues<'a>(
    a: &'a Result<Quote, QuoteError>,
    b: &'a Result<Quote, QuoteError>,
) -> Vec<&'a Venue> {
    [a, b].into_iter().filter_map(|r| r.as_ref().err()).map(QuoteError::venue).collect()
}

// up to a quarter of the backoff
fn jitter(backoff: Duration) -> Duration {
    let max_ms = (backoff.as_millis() / 4) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
