//! Owned application state shared by the command handlers and the loop task.

use std::sync::{Arc, Weak};
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::bot::commands::Command;
use crate::bot::{format, Notifier};
use crate::engine::arb_loop::ArbitrageLoop;
use crate::engine::ledger::Ledger;
use crate::engine::spread::SpreadCalculator;
use crate::engine::types::{
    Quote, SimulatedTrade, SimulationError, SpreadError, SpreadPair, SpreadResult,
};
use crate::market_data::adapters::kraken::KrakenSource;
use crate::market_data::adapters::okx::OkxSource;
use crate::market_data::adapters::{http_client, QuoteError, QuoteSource};
use crate::market_data::feed::{QuoteFeed, RetryPolicy};
use crate::settings::Settings;
use crate::telemetry::{CYCLES_TOTAL, OPPORTUNITIES_TOTAL, REJECTED_TOTAL};

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Spread(#[from] SpreadError),
}

/// What happened to one profitable direction.
#[derive(Debug, Clone)]
pub enum Outcome {
    Simulated { spread: SpreadResult, buy: SimulatedTrade, sell: SimulatedTrade },
    Rejected { spread: SpreadResult, error: SimulationError },
}

#[derive(Debug, Clone)]
pub struct CycleReport {
    pub quotes: (Quote, Quote),
    pub spreads: SpreadPair,
    /// Empty when no direction cleared the threshold.
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Copy)]
pub struct ContextOptions {
    pub loop_interval: Duration,
    pub trade_size_usdt: Decimal,
    pub history_len: usize,
    pub notify_idle: bool,
}

pub struct BotContext {
    feed: QuoteFeed,
    calculator: SpreadCalculator,
    ledger: Mutex<Ledger>,
    arb_loop: ArbitrageLoop,
    notifier: Arc<dyn Notifier>,
    options: ContextOptions,
}

impl BotContext {
    pub fn new(
        feed: QuoteFeed,
        calculator: SpreadCalculator,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
        options: ContextOptions,
    ) -> Self {
        Self {
            feed,
            calculator,
            ledger: Mutex::new(ledger),
            arb_loop: ArbitrageLoop::new(options.loop_interval),
            notifier,
            options,
        }
    }

    /// Wire up the OKX and Kraken sources and open one account per venue.
    pub fn from_settings(
        settings: &Settings,
        notifier: Arc<dyn Notifier>,
    ) -> reqwest::Result<Self> {
        let client = http_client(settings.fetch_timeout)?;
        let okx = OkxSource::new(
            client.clone(),
            &settings.okx.base_url,
            settings.okx.credentials.clone(),
        );
        let kraken = KrakenSource::new(
            client,
            &settings.kraken.base_url,
            settings.kraken.credentials.clone(),
        );
        info!(
            okx_credentials = okx.has_credentials(),
            kraken_credentials = kraken.has_credentials(),
            "Exchange sources configured"
        );
        let okx: Arc<dyn QuoteSource> = Arc::new(okx);
        let kraken: Arc<dyn QuoteSource> = Arc::new(kraken);

        let mut ledger = Ledger::new(settings.fee_pct);
        ledger.open_account(okx.venue().clone(), settings.starting_capital_usdt);
        ledger.open_account(kraken.venue().clone(), settings.starting_capital_usdt);

        let retry = RetryPolicy { max_retries: settings.fetch_retries, ..RetryPolicy::default() };
        let feed =
            QuoteFeed::new(okx, kraken, settings.pair.clone(), settings.fetch_timeout, retry);
        let calculator = SpreadCalculator::new(settings.fee_pct, settings.min_profit_pct);

        let options = ContextOptions {
            loop_interval: settings.loop_interval,
            trade_size_usdt: settings.trade_size_usdt,
            history_len: settings.history_len,
            notify_idle: settings.notify_idle,
        };
        Ok(Self::new(feed, calculator, ledger, notifier, options))
    }

    /// Fetch, evaluate and simulate every profitable direction, A→B first.
    #[instrument(level = "debug", skip(self), fields(pair = %self.feed.pair()))]
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        counter!(CYCLES_TOTAL).increment(1);
        let (a, b) = self.feed.fetch_pair().await?;
        let spreads = self.calculator.evaluate(&a, &b)?;

        let mut outcomes = Vec::new();
        {
            let mut ledger = self.ledger.lock();
            for (spread, buy, sell) in [(&spreads.a_to_b, &a, &b), (&spreads.b_to_a, &b, &a)] {
                if !spread.profitable {
                    continue;
                }
                match ledger.simulate(spread, buy, sell, self.options.trade_size_usdt) {
                    Ok((buy, sell)) => {
                        counter!(OPPORTUNITIES_TOTAL).increment(1);
                        outcomes.push(Outcome::Simulated { spread: spread.clone(), buy, sell });
                    }
                    Err(error) => {
                        counter!(REJECTED_TOTAL).increment(1);
                        outcomes.push(Outcome::Rejected { spread: spread.clone(), error });
                    }
                }
            }
        }

        Ok(CycleReport { quotes: (a, b), spreads, outcomes })
    }

    /// Run one command and render the reply. Never fails; errors become text.
    #[instrument(skip(self, command), fields(command = command.name()))]
    pub async fn handle(self: &Arc<Self>, command: Command) -> String {
        let pair = self.feed.pair();
        match command {
            Command::Help => format::help_text(),
            Command::Status => match self.status_snapshot().await {
                Ok((a, b, spreads)) => format::status(pair, &a, &b, &spreads),
                Err(e) => {
                    warn!(error = %e, "Status query failed");
                    format::quote_failure(pair, &e)
                }
            },
            Command::Arbitrage => match self.run_cycle().await {
                Ok(report) => format::analysis(pair, &report),
                Err(e) => {
                    warn!(error = %e, "On-demand arbitrage cycle failed");
                    format::quote_failure(pair, &e)
                }
            },
            Command::AccountStatus => format::accounts(self.ledger.lock().accounts()),
            Command::History { limit } => {
                let n = limit.unwrap_or(self.options.history_len);
                format::history(self.ledger.lock().recent(n))
            }
            Command::StartLoop => self.start_loop().await,
            Command::StopLoop => match self.arb_loop.stop().await {
                Ok(()) => format::loop_stopped(),
                Err(e) => format::loop_error(&e),
            },
            Command::Unknown(input) => format::unknown_command(&input),
        }
    }

    async fn status_snapshot(&self) -> Result<(Quote, Quote, SpreadPair), CycleError> {
        let (a, b) = self.feed.fetch_pair().await?;
        let spreads = self.calculator.evaluate(&a, &b)?;
        Ok((a, b, spreads))
    }

    async fn start_loop(self: &Arc<Self>) -> String {
        // The task only holds a weak reference so dropping the context ends it
        let weak: Weak<Self> = Arc::downgrade(self);
        let started = self
            .arb_loop
            .start(move || {
                let weak = weak.clone();
                async move {
                    if let Some(ctx) = weak.upgrade() {
                        ctx.scheduled_cycle().await;
                    }
                }
            })
            .await;

        match started {
            Ok(()) => format::loop_started(self.arb_loop.interval()),
            Err(e) => format::loop_error(&e),
        }
    }

    /// One loop tick: run a cycle and push the outcome to the notifier.
    async fn scheduled_cycle(&self) {
        let pair = self.feed.pair();
        let message = match self.run_cycle().await {
            Ok(report) => {
                if report.outcomes.is_empty() {
                    debug!(pair = %pair, "No arbitrage opportunity");
                }
                format::loop_report(pair, &report, self.options.notify_idle)
            }
            Err(e) => {
                warn!(pair = %pair, error = %e, "Arbitrage cycle failed; loop keeps running");
                Some(format::quote_failure(pair, &e))
            }
        };

        if let Some(text) = message {
            if let Err(e) = self.notifier.notify(&text).await {
                warn!(error = %e, "Failed to deliver loop notification");
            }
        }
    }

    pub async fn is_loop_running(&self) -> bool {
        self.arb_loop.is_running().await
    }

    pub async fn shutdown(&self) {
        if self.arb_loop.stop().await.is_ok() {
            info!("Arbitrage loop stopped on shutdown");
        }
    }
}
