use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// A named exchange / price source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
}

impl Venue {
    pub fn new(name: &str) -> Self {
        Self { name: name.trim().to_uppercase() }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// Trading pair, e.g. BTC/USDT
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self { base: base.trim().to_uppercase(), quote: quote.trim().to_uppercase() }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid trading pair '{0}', expected BASE/QUOTE")]
pub struct PairParseError(pub String);

impl FromStr for Pair {
    type Err = PairParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(|c: char| c == '/' || c == '-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None)
                if !base.trim().is_empty() && !quote.trim().is_empty() =>
            {
                Ok(Pair::new(base, quote))
            }
            _ => Err(PairParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Best bid/ask snapshot for one venue. Created fresh on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub venue: Venue,
    pub pair: Pair,
    pub bid: Decimal,
    pub ask: Decimal,
    pub ts: DateTime<Utc>,
}

/// One direction of a cross-venue spread: buy at `buy_price` (ask) on
/// `buy_venue`, sell at `sell_price` (bid) on `sell_venue`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadResult {
    pub buy_venue: Venue,
    pub sell_venue: Venue,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    /// sell bid minus buy ask, in quote currency
    pub gross_usdt: Decimal,
    pub gross_pct: Decimal,
    /// gross_pct minus the round-trip fee allowance
    pub spread_pct: Decimal,
    pub profitable: bool,
}

/// Both directions for a pair of quotes (A buy / B sell, then B buy / A sell).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadPair {
    pub a_to_b: SpreadResult,
    pub b_to_a: SpreadResult,
}

impl SpreadPair {
    pub fn directions(&self) -> [&SpreadResult; 2] {
        [&self.a_to_b, &self.b_to_a]
    }

    pub fn profitable(&self) -> impl Iterator<Item = &SpreadResult> {
        self.directions().into_iter().filter(|s| s.profitable)
    }
}

/// A recorded hypothetical fill. No real order is ever placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedTrade {
    pub ts: DateTime<Utc>,
    pub side: Side,
    pub venue: Venue,
    pub pair: Pair,
    pub price: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountState {
    pub venue: Venue,
    pub capital_usdt: Decimal,
    pub starting_capital_usdt: Decimal,
}

impl AccountState {
    pub fn new(venue: Venue, starting_capital_usdt: Decimal) -> Self {
        Self { venue, capital_usdt: starting_capital_usdt, starting_capital_usdt }
    }

    pub fn delta_usdt(&self) -> Decimal {
        self.capital_usdt - self.starting_capital_usdt
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpreadError {
    #[error("quote unavailable on {venue}: {reason}")]
    QuoteUnavailable { venue: Venue, reason: &'static str },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("spread {buy_venue} -> {sell_venue} is not profitable")]
    NotProfitable { buy_venue: Venue, sell_venue: Venue },
    #[error("insufficient capital on {venue}: have {available:.2} USDT, need {required:.2} USDT")]
    InsufficientCapital { venue: Venue, available: Decimal, required: Decimal },
    #[error("no simulated account for {venue}")]
    UnknownVenue { venue: Venue },
    #[error("quotes do not match the spread direction: {reason}")]
    QuoteMismatch { reason: &'static str },
    #[error("trade size must be positive, got {0}")]
    InvalidTradeSize(Decimal),
}
