//! In-memory simulated ledger: per-venue capital plus the append-only trade history.
//!
//! The ledger only lives for the process lifetime. Callers serialise access
//! (the bot context keeps it behind a single mutex).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::engine::types::{
    AccountState, Quote, SimulatedTrade, SimulationError, Side, SpreadResult, Venue,
};

#[derive(Debug, Clone)]
pub struct Ledger {
    accounts: Vec<AccountState>,
    history: Vec<SimulatedTrade>,
    // fee charged on each leg, as a fraction of the leg notional
    leg_fee_rate: Decimal,
}

impl Ledger {
    /// `fee_pct` is the round-trip allowance in percent; half of it is charged per leg.
    pub fn new(fee_pct: Decimal) -> Self {
        Self { accounts: Vec::new(), history: Vec::new(), leg_fee_rate: fee_pct / dec!(200) }
    }

    /// Open (or reset) the simulated account for `venue`.
    pub fn open_account(&mut self, venue: Venue, starting_capital_usdt: Decimal) {
        let capital = starting_capital_usdt.max(Decimal::ZERO);
        match self.accounts.iter_mut().find(|a| a.venue == venue) {
            Some(existing) => *existing = AccountState::new(venue, capital),
            None => self.accounts.push(AccountState::new(venue, capital)),
        }
    }

    pub fn accounts(&self) -> &[AccountState] {
        &self.accounts
    }

    pub fn account(&self, venue: &Venue) -> Option<&AccountState> {
        self.accounts.iter().find(|a| &a.venue == venue)
    }

    pub fn history(&self) -> &[SimulatedTrade] {
        &self.history
    }

    /// The last `n` trades, oldest first.
    pub fn recent(&self, n: usize) -> &[SimulatedTrade] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Record a synthetic BUY on the spread's buy venue and a synthetic SELL on
    /// its sell venue, moving simulated capital accordingly.
    ///
    /// Nothing is recorded and no account changes unless every check passes.
    pub fn simulate(
        &mut self,
        spread: &SpreadResult,
        buy: &Quote,
        sell: &Quote,
        trade_size_usdt: Decimal,
    ) -> Result<(SimulatedTrade, SimulatedTrade), SimulationError> {
        if !spread.profitable {
            return Err(SimulationError::NotProfitable {
                buy_venue: spread.buy_venue.clone(),
                sell_venue: spread.sell_venue.clone(),
            });
        }
        if trade_size_usdt <= Decimal::ZERO {
            return Err(SimulationError::InvalidTradeSize(trade_size_usdt));
        }
        if buy.venue != spread.buy_venue || sell.venue != spread.sell_venue {
            return Err(SimulationError::QuoteMismatch {
                reason: "quote venues differ from the spread venues",
            });
        }
        if buy.venue == sell.venue {
            return Err(SimulationError::QuoteMismatch {
                reason: "buy and sell venue are the same",
            });
        }
        if buy.ask <= Decimal::ZERO || sell.bid <= Decimal::ZERO {
            return Err(SimulationError::QuoteMismatch { reason: "quote prices must be positive" });
        }

        let buy_idx = self.index_of(&buy.venue)?;
        let sell_idx = self.index_of(&sell.venue)?;

        let buy_fee = trade_size_usdt * self.leg_fee_rate;
        let required = trade_size_usdt + buy_fee;
        let available = self.accounts[buy_idx].capital_usdt;
        if available < required {
            let error = SimulationError::InsufficientCapital {
                venue: buy.venue.clone(),
                available,
                required,
            };
            warn!(
                venue = %buy.venue,
                available = %available,
                required = %required,
                error = %error,
                "Rejecting simulated trade"
            );
            return Err(error);
        }

        let quantity = trade_size_usdt / buy.ask;
        let proceeds = quantity * sell.bid;
        let sell_fee = proceeds * self.leg_fee_rate;

        self.accounts[buy_idx].capital_usdt -= required;
        self.accounts[sell_idx].capital_usdt += (proceeds - sell_fee).max(Decimal::ZERO);

        let ts = self.next_timestamp(Utc::now());
        let buy_trade = SimulatedTrade {
            ts,
            side: Side::Buy,
            venue: buy.venue.clone(),
            pair: buy.pair.clone(),
            price: buy.ask,
            quantity,
        };
        let sell_trade = SimulatedTrade {
            ts,
            side: Side::Sell,
            venue: sell.venue.clone(),
            pair: sell.pair.clone(),
            price: sell.bid,
            quantity,
        };
        self.history.push(buy_trade.clone());
        self.history.push(sell_trade.clone());

        info!(
            buy = %buy.venue,
            sell = %sell.venue,
            quantity = %quantity,
            buy_price = %buy.ask,
            sell_price = %sell.bid,
            "[SIMULATION] Recorded arbitrage round trip"
        );
        debug!(history_len = self.history.len(), "Ledger updated");

        Ok((buy_trade, sell_trade))
    }

    fn index_of(&self, venue: &Venue) -> Result<usize, SimulationError> {
        self.accounts
            .iter()
            .position(|a| &a.venue == venue)
            .ok_or_else(|| SimulationError::UnknownVenue { venue: venue.clone() })
    }

    // Wall clocks can step backwards; the history must not.
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.history.last() {
            Some(last) if last.ts > now => last.ts,
            _ => now,
        }
    }
}
