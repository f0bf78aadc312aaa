use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{instrument, trace};

use crate::engine::types::{Quote, SpreadError, SpreadPair, SpreadResult};

/// Minimum net spread (percent) an opportunity has to beat.
pub const DEFAULT_MIN_PROFIT_PCT: Decimal = dec!(0.5);

/// Round-trip fee allowance (percent): 0.1% per leg.
pub const DEFAULT_FEE_PCT: Decimal = dec!(0.2);

/// Pure cross-venue spread evaluation. Holds no state besides its thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadCalculator {
    fee_pct: Decimal,
    min_profit_pct: Decimal,
}

impl Default for SpreadCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_PCT, DEFAULT_MIN_PROFIT_PCT)
    }
}

impl SpreadCalculator {
    pub fn new(fee_pct: Decimal, min_profit_pct: Decimal) -> Self {
        Self { fee_pct, min_profit_pct }
    }

    pub fn fee_pct(&self) -> Decimal {
        self.fee_pct
    }

    pub fn min_profit_pct(&self) -> Decimal {
        self.min_profit_pct
    }

    /// Evaluate both directions: buy on `a` / sell on `b`, and buy on `b` / sell on `a`.
    #[instrument(level = "trace", skip_all, fields(a = %a.venue, b = %b.venue))]
    pub fn evaluate(&self, a: &Quote, b: &Quote) -> Result<SpreadPair, SpreadError> {
        ensure_priced(a)?;
        ensure_priced(b)?;

        let a_to_b = self.direction(a, b)?;
        let b_to_a = self.direction(b, a)?;
        Ok(SpreadPair { a_to_b, b_to_a })
    }

    fn direction(&self, buy: &Quote, sell: &Quote) -> Result<SpreadResult, SpreadError> {
        let gross_usdt = sell.bid - buy.ask;
        let gross_pct = gross_usdt
            .checked_div(buy.ask)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .ok_or(SpreadError::QuoteUnavailable {
                venue: buy.venue.clone(),
                reason: "ask price out of range",
            })?;
        let spread_pct = gross_pct - self.fee_pct;
        let profitable = spread_pct > self.min_profit_pct;

        trace!(
            buy = %buy.venue,
            sell = %sell.venue,
            gross_usdt = %gross_usdt,
            spread_pct = %spread_pct,
            profitable,
            "Evaluated direction"
        );

        Ok(SpreadResult {
            buy_venue: buy.venue.clone(),
            sell_venue: sell.venue.clone(),
            buy_price: buy.ask,
            sell_price: sell.bid,
            gross_usdt,
            gross_pct,
            spread_pct,
            profitable,
        })
    }
}

fn ensure_priced(q: &Quote) -> Result<(), SpreadError> {
    if q.ask <= Decimal::ZERO {
        return Err(SpreadError::QuoteUnavailable {
            venue: q.venue.clone(),
            reason: "ask is missing or zero",
        });
    }
    if q.bid <= Decimal::ZERO {
        return Err(SpreadError::QuoteUnavailable {
            venue: q.venue.clone(),
            reason: "bid is missing or zero",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Pair, Venue};
    use chrono::Utc;
    use proptest::prelude::*;

    fn quote(venue: &str, bid: Decimal, ask: Decimal) -> Quote {
        Quote { venue: Venue::new(venue), pair: Pair::new("BTC", "USDT"), bid, ask, ts: Utc::now() }
    }

    #[test]
    fn test_buy_a_sell_b_is_profitable() {
        let calc = SpreadCalculator::new(dec!(0), dec!(0.5));
        let a = quote("A", dec!(99), dec!(100));
        let b = quote("B", dec!(101), dec!(99));

        let pair = calc.evaluate(&a, &b).unwrap();
        assert_eq!(pair.a_to_b.buy_venue, Venue::new("A"));
        assert_eq!(pair.a_to_b.sell_venue, Venue::new("B"));
        assert_eq!(pair.a_to_b.gross_usdt, dec!(1));
        assert_eq!(pair.a_to_b.spread_pct, dec!(1));
        assert!(pair.a_to_b.profitable);

        // 99 bid on A against 99 ask on B: flat
        assert_eq!(pair.b_to_a.spread_pct, dec!(0));
        assert!(!pair.b_to_a.profitable);
        assert_eq!(pair.profitable().count(), 1);
    }

    #[test]
    fn test_fee_is_subtracted() {
        let calc = SpreadCalculator::new(dec!(0.6), dec!(0.5));
        let a = quote("A", dec!(99), dec!(100));
        let b = quote("B", dec!(101), dec!(99));

        let pair = calc.evaluate(&a, &b).unwrap();
        assert_eq!(pair.a_to_b.gross_pct, dec!(1));
        assert_eq!(pair.a_to_b.spread_pct, dec!(0.4));
        assert!(!pair.a_to_b.profitable);
    }

    #[test]
    fn test_threshold_is_strict() {
        let calc = SpreadCalculator::new(dec!(0), dec!(1));
        let a = quote("A", dec!(99), dec!(100));
        let b = quote("B", dec!(101), dec!(102));
        assert!(!calc.evaluate(&a, &b).unwrap().a_to_b.profitable);
    }

    #[test]
    fn test_zero_ask_is_quote_unavailable() {
        let calc = SpreadCalculator::default();
        let a = quote("A", dec!(99), dec!(0));
        let b = quote("B", dec!(101), dec!(99));

        let err = calc.evaluate(&a, &b).unwrap_err();
        assert_eq!(
            err,
            SpreadError::QuoteUnavailable {
                venue: Venue::new("A"),
                reason: "ask is missing or zero",
            }
        );
        // Same on the other side
        assert!(calc.evaluate(&b, &a).is_err());
    }

    #[test]
    fn test_zero_bid_is_quote_unavailable() {
        let calc = SpreadCalculator::default();
        let a = quote("A", dec!(0), dec!(100));
        let b = quote("B", dec!(101), dec!(99));
        assert!(matches!(calc.evaluate(&a, &b), Err(SpreadError::QuoteUnavailable { .. })));
    }

    fn price() -> impl Strategy<Value = Decimal> {
        (1u64..10_000_000u64).prop_map(|cents| Decimal::new(cents as i64, 2))
    }

    proptest! {
        #[test]
        fn prop_directions_are_independent(
            a_bid in price(),
            a_ask in price(),
            b_bid in price(),
            b_ask in price()
        ) {
            let calc = SpreadCalculator::new(dec!(0.2), dec!(0.1));
            let a = quote("A", a_bid, a_ask);
            let b = quote("B", b_bid, b_ask);
            let pair = calc.evaluate(&a, &b).unwrap();

            let expected_ab = (b_bid - a_ask) / a_ask * dec!(100) - dec!(0.2);
            let expected_ba = (a_bid - b_ask) / b_ask * dec!(100) - dec!(0.2);
            prop_assert_eq!(pair.a_to_b.spread_pct, expected_ab);
            prop_assert_eq!(pair.b_to_a.spread_pct, expected_ba);
            prop_assert_eq!(pair.a_to_b.profitable, expected_ab > dec!(0.1));
            prop_assert_eq!(pair.b_to_a.profitable, expected_ba > dec!(0.1));
        }

        #[test]
        fn prop_uncrossed_books_have_at_most_one_opportunity(
            a_bid in price(),
            a_spread in price(),
            b_bid in price(),
            b_spread in price()
        ) {
            // ask >= bid on each venue
            let a = quote("A", a_bid, a_bid + a_spread);
            let b = quote("B", b_bid, b_bid + b_spread);
            let pair = SpreadCalculator::new(dec!(0), dec!(0)).evaluate(&a, &b).unwrap();
            prop_assert!(pair.profitable().count() <= 1);
        }

        #[test]
        fn prop_zero_ask_never_panics(bid in price(), other_bid in price(), other_ask in price()) {
            let a = quote("A", bid, Decimal::ZERO);
            let b = quote("B", other_bid, other_ask);
            let calc = SpreadCalculator::default();
            prop_assert!(calc.evaluate(&a, &b).is_err());
            prop_assert!(calc.evaluate(&b, &a).is_err());
        }
    }
}
