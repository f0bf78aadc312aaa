// Convert wire strings into validated Decimal prices and Quote snapshots.
// Exchanges send prices as strings ("67012.5", "67012.50000"); empty strings
// mean "no price on this side".

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::engine::types::{Pair, Quote, Venue};
use crate::market_data::adapters::QuoteError;

pub struct Normaliser<'a> {
    pub venue: &'a Venue,
    pub pair: &'a Pair,
}

impl<'a> Normaliser<'a> {
    pub fn new(venue: &'a Venue, pair: &'a Pair) -> Self {
        Self { venue, pair }
    }

    pub fn price(&self, field: &str, s: &str) -> Result<Decimal, QuoteError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(self.malformed(format!("missing {field} price")));
        }
        let value = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|_| self.malformed(format!("unparseable {field} price '{s}'")))?;
        if value <= Decimal::ZERO {
            return Err(self.malformed(format!("non-positive {field} price {value}")));
        }
        Ok(value)
    }

    /// Build a quote from raw bid/ask strings; `ts` defaults to now.
    pub fn quote(
        &self,
        bid: &str,
        ask: &str,
        ts: Option<DateTime<Utc>>,
    ) -> Result<Quote, QuoteError> {
        Ok(Quote {
            venue: self.venue.clone(),
            pair: self.pair.clone(),
            bid: self.price("bid", bid)?,
            ask: self.price("ask", ask)?,
            ts: ts.unwrap_or_else(Utc::now),
        })
    }

    /// Millisecond epoch string, as OKX sends it.
    pub fn timestamp_ms(&self, s: &str) -> Option<DateTime<Utc>> {
        s.trim().parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
    }

    pub fn malformed(&self, reason: String) -> QuoteError {
        QuoteError::Malformed { venue: self.venue.clone(), reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_parsing() {
        let venue = Venue::new("okx");
        let pair = Pair::new("BTC", "USDT");
        let norm = Normaliser::new(&venue, &pair);

        assert_eq!(norm.price("ask", "67012.5").unwrap(), dec!(67012.5));
        assert_eq!(norm.price("ask", " 67012.50000 ").unwrap(), dec!(67012.5));
        assert_eq!(norm.price("bid", "1.5e3").unwrap(), dec!(1500));
        assert!(matches!(norm.price("ask", ""), Err(QuoteError::Malformed { .. })));
        assert!(matches!(norm.price("ask", "abc"), Err(QuoteError::Malformed { .. })));
        assert!(matches!(norm.price("ask", "0"), Err(QuoteError::Malformed { .. })));
        assert!(matches!(norm.price("ask", "-3"), Err(QuoteError::Malformed { .. })));
    }

    #[test]
    fn test_quote_and_timestamp() {
        let venue = Venue::new("okx");
        let pair = Pair::new("BTC", "USDT");
        let norm = Normaliser::new(&venue, &pair);

        let ts = norm.timestamp_ms("1700000000000");
        assert_eq!(ts.map(|t| t.timestamp()), Some(1_700_000_000));
        assert_eq!(norm.timestamp_ms("later"), None);

        let q = norm.quote("99.5", "100.5", ts).unwrap();
        assert_eq!(q.bid, dec!(99.5));
        assert_eq!(q.ask, dec!(100.5));
        assert_eq!(q.venue, venue);
        assert!(norm.quote("99.5", "", None).is_err());
    }
}
