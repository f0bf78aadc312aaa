//! Message rendering. Output is Telegram-flavoured HTML (`<b>`, `<i>`, `<pre>`);
//! the console strips the tags with [`strip_tags`].

use std::fmt::Write;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::bot::context::{CycleReport, Outcome};
use crate::engine::arb_loop::LoopError;
use crate::engine::types::{AccountState, Pair, Quote, SimulatedTrade, SpreadPair, SpreadResult};

fn usdt(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

fn pct(d: Decimal) -> String {
    format!("{:.3}%", d.round_dp(3))
}

fn signed(d: Decimal) -> String {
    if d.is_sign_negative() && !d.is_zero() {
        usdt(d)
    } else {
        format!("+{}", usdt(d))
    }
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Remove markup and decode the three entities `escape_html` produces.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

pub fn help_text() -> String {
    [
        "<b>Arbitrage simulation bot</b>",
        "",
        "/status - bid/ask on both venues and both spreads",
        "/arbitrage - run one analysis and simulate any opportunity",
        "/account_status - simulated capital and change per venue",
        "/history [n] - last simulated trades (default 10)",
        "/start_loop - check continuously",
        "/stop_loop - stop the continuous check",
        "/help - this message",
    ]
    .join("\n")
}

fn quote_lines(out: &mut String, q: &Quote) {
    let _ = writeln!(
        out,
        "<b>{}</b>: bid <b>{}</b> / ask <b>{}</b>",
        q.venue,
        usdt(q.bid),
        usdt(q.ask)
    );
}

fn spread_line(out: &mut String, s: &SpreadResult) {
    let _ = writeln!(
        out,
        "• {} → {}: <b>{} USDT</b> ({} net)",
        s.buy_venue,
        s.sell_venue,
        usdt(s.gross_usdt),
        pct(s.spread_pct)
    );
}

pub fn status(pair: &Pair, a: &Quote, b: &Quote, spreads: &SpreadPair) -> String {
    let mut out = format!("<b>Prices for {pair}</b>\n\n");
    quote_lines(&mut out, a);
    quote_lines(&mut out, b);
    out.push_str("\n<b>Spreads</b>\n");
    for s in spreads.directions() {
        spread_line(&mut out, s);
    }
    out.trim_end().to_string()
}

fn outcome_lines(out: &mut String, outcome: &Outcome) {
    match outcome {
        Outcome::Simulated { spread, buy, sell } => {
            let _ = writeln!(
                out,
                "<b>Opportunity:</b> buy on <b>{}</b>, sell on <b>{}</b> ({} net)",
                spread.buy_venue,
                spread.sell_venue,
                pct(spread.spread_pct)
            );
            for t in [buy, sell] {
                let _ = writeln!(
                    out,
                    "  {} {} {} @ {} USDT",
                    t.side,
                    t.venue,
                    t.quantity.round_dp(6),
                    usdt(t.price)
                );
            }
        }
        Outcome::Rejected { spread, error } => {
            let _ = writeln!(
                out,
                "<b>Opportunity rejected:</b> {} → {} ({} net): {}",
                spread.buy_venue,
                spread.sell_venue,
                pct(spread.spread_pct),
                escape_html(&error.to_string())
            );
        }
    }
}

/// Full reply for an on-demand `arbitrage` command.
pub fn analysis(pair: &Pair, report: &CycleReport) -> String {
    let mut out = format!("<b>Arbitrage analysis for {pair}</b>\n\n");
    quote_lines(&mut out, &report.quotes.0);
    quote_lines(&mut out, &report.quotes.1);
    out.push_str("\n<b>Net spread after fees</b>\n");
    for s in report.spreads.directions() {
        spread_line(&mut out, s);
    }
    out.push('\n');
    if report.outcomes.is_empty() {
        out.push_str("No arbitrage opportunity right now.");
    } else {
        for outcome in &report.outcomes {
            outcome_lines(&mut out, outcome);
        }
    }
    out.trim_end().to_string()
}

/// Loop notification. `None` when nothing was found and idle reports are off.
pub fn loop_report(pair: &Pair, report: &CycleReport, notify_idle: bool) -> Option<String> {
    if report.outcomes.is_empty() {
        if !notify_idle {
            return None;
        }
        let best = report
            .spreads
            .directions()
            .into_iter()
            .map(|s| s.spread_pct)
            .max()
            .unwrap_or(Decimal::ZERO);
        return Some(format!("<i>{pair}: no opportunity (best net spread {})</i>", pct(best)));
    }

    let mut out = format!("<b>Loop update for {pair}</b>\n");
    for outcome in &report.outcomes {
        outcome_lines(&mut out, outcome);
    }
    Some(out.trim_end().to_string())
}

pub fn quote_failure(pair: &Pair, error: &dyn std::fmt::Display) -> String {
    format!("<b>Could not fetch prices for {pair}:</b> {}", escape_html(&error.to_string()))
}

pub fn accounts(accounts: &[AccountState]) -> String {
    let mut out = String::from("<b>Simulated accounts</b>\n");
    for a in accounts {
        let _ = write!(
            out,
            "\n<b>{}</b>\n• Capital: <b>{} USDT</b>\n• Change: <b>{} USDT</b>\n",
            a.venue,
            usdt(a.capital_usdt),
            signed(a.delta_usdt())
        );
    }
    out.trim_end().to_string()
}

pub fn history(trades: &[SimulatedTrade]) -> String {
    if trades.is_empty() {
        return "<b>No simulated trades recorded yet.</b>".to_string();
    }
    let mut out = format!("<b>Last {} simulated trades</b>\n<pre>", trades.len());
    let _ = writeln!(
        out,
        "{:<19}  {:<4}  {:<8}  {:>12}  {:>12}",
        "Time (UTC)", "Side", "Venue", "Price", "Qty"
    );
    for t in trades {
        let _ = writeln!(
            out,
            "{:<19}  {:<4}  {:<8}  {:>12}  {:>12}",
            t.ts.format("%Y-%m-%d %H:%M:%S"),
            t.side.to_string(),
            t.venue.name,
            usdt(t.price),
            t.quantity.round_dp(6).to_string()
        );
    }
    out.push_str("</pre>");
    out
}

pub fn loop_started(interval: Duration) -> String {
    format!("<b>Arbitrage loop started</b> (every {}s).", interval.as_secs())
}

pub fn loop_already_running() -> String {
    "<b>The arbitrage loop is already running.</b>".to_string()
}

pub fn loop_stopped() -> String {
    "<b>Arbitrage loop stopped.</b>".to_string()
}

pub fn loop_not_running() -> String {
    "<b>No arbitrage loop is running.</b>".to_string()
}

/// Reply for a start or stop request that was a no-op.
pub fn loop_error(error: &LoopError) -> String {
    match error {
        LoopError::AlreadyRunning => loop_already_running(),
        LoopError::NotRunning => loop_not_running(),
    }
}

pub fn unknown_command(input: &str) -> String {
    format!("Unknown command <code>{}</code>. Send /help for the list.", escape_html(input))
}
