// Kraken REST ticker source

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::kraken_types::KrakenTickerResponse;
use super::{get_text, ApiCredentials, QuoteError, QuoteSource};
use crate::engine::types::{Pair, Quote, Venue};
use crate::market_data::normaliser::Normaliser;

pub const KRAKEN_REST_URL: &str = "https://api.kraken.com";

pub struct KrakenSource {
    venue: Venue,
    base_url: String,
    client: reqwest::Client,
    credentials: Option<ApiCredentials>,
}

impl KrakenSource {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        credentials: Option<ApiCredentials>,
    ) -> Self {
        Self {
            venue: Venue::new("KRAKEN"),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    // Kraken still calls bitcoin XBT: BTC/USDT -> "XBTUSDT"
    pub fn pair_name(pair: &Pair) -> String {
        let asset = |s: &str| if s == "BTC" { "XBT".to_string() } else { s.to_string() };
        format!("{}{}", asset(&pair.base), asset(&pair.quote))
    }
}

/// Validate a Kraken ticker body into a Quote.
pub fn parse_ticker(venue: &Venue, pair: &Pair, body: &str) -> Result<Quote, QuoteError> {
    let norm = Normaliser::new(venue, pair);
    let res: KrakenTickerResponse =
        serde_json::from_str(body).map_err(|e| norm.malformed(format!("invalid JSON: {e}")))?;

    if !res.error.is_empty() {
        return Err(QuoteError::Api { venue: venue.clone(), message: res.error.join(", ") });
    }
    // Only one pair is requested, so the single entry is ours whatever its key
    let ticker = res
        .result
        .and_then(|result| result.into_values().next())
        .ok_or_else(|| norm.malformed("empty result".to_string()))?;

    let ask = ticker.a.first().ok_or_else(|| norm.malformed("missing ask".to_string()))?;
    let bid = ticker.b.first().ok_or_else(|| norm.malformed("missing bid".to_string()))?;
    norm.quote(bid, ask, None)
}

#[async_trait]
impl QuoteSource for KrakenSource {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    #[instrument(level = "debug", skip(self, pair), fields(venue = %self.venue, pair = %pair))]
    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote, QuoteError> {
        let url = format!("{}/0/public/Ticker", self.base_url);
        let name = Self::pair_name(pair);
        let body = get_text(&self.client, &self.venue, &url, &[("pair", name.as_str())]).await?;
        let quote = parse_ticker(&self.venue, pair, &body)?;
        debug!(bid = %quote.bid, ask = %quote.ask, "Kraken quote");
        Ok(quote)
    }
}
