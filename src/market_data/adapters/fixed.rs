// In-memory quote source with scripted prices for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use super::{QuoteError, QuoteSource};
use crate::engine::types::{Pair, Quote, Venue};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedPrice {
    Quote { bid: Decimal, ask: Decimal },
    Unavailable,
}

/// Serves queued prices first, then repeats the current one.
pub struct FixedSource {
    venue: Venue,
    current: Mutex<FixedPrice>,
    queued: Mutex<VecDeque<FixedPrice>>,
    fetches: AtomicUsize,
}

impl FixedSource {
    pub fn new(venue: &str, bid: Decimal, ask: Decimal) -> Self {
        Self {
            venue: Venue::new(venue),
            current: Mutex::new(FixedPrice::Quote { bid, ask }),
            queued: Mutex::new(VecDeque::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, bid: Decimal, ask: Decimal) {
        *self.current.lock() = FixedPrice::Quote { bid, ask };
    }

    pub fn set_unavailable(&self) {
        *self.current.lock() = FixedPrice::Unavailable;
    }

    /// Serve `price` once, before falling back to the current price.
    pub fn push(&self, price: FixedPrice) {
        self.queued.lock().push_back(price);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteSource for FixedSource {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote, QuoteError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let price = self.queued.lock().pop_front().unwrap_or_else(|| *self.current.lock());
        match price {
            FixedPrice::Quote { bid, ask } => Ok(Quote {
                venue: self.venue.clone(),
                pair: pair.clone(),
                bid,
                ask,
                ts: Utc::now(),
            }),
            FixedPrice::Unavailable => Err(QuoteError::Api {
                venue: self.venue.clone(),
                message: "no price available".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_queued_then_current() {
        let src = FixedSource::new("a", dec!(99), dec!(100));
        let pair = Pair::new("BTC", "USDT");
        src.push(FixedPrice::Unavailable);

        assert!(src.fetch_quote(&pair).await.is_err());
        let q = src.fetch_quote(&pair).await.unwrap();
        assert_eq!((q.bid, q.ask), (dec!(99), dec!(100)));

        src.set(dec!(1), dec!(2));
        assert_eq!(src.fetch_quote(&pair).await.unwrap().ask, dec!(2));
        assert_eq!(src.fetch_count(), 3);
    }
}
