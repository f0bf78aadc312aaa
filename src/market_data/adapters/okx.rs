// OKX REST ticker source

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::okx_types::OkxTickerResponse;
use super::{get_text, ApiCredentials, QuoteError, QuoteSource};
use crate::engine::types::{Pair, Quote, Venue};
use crate::market_data::normaliser::Normaliser;

pub const OKX_REST_URL: &str = "https://www.okx.com";

pub struct OkxSource {
    venue: Venue,
    base_url: String,
    client: reqwest::Client,
    credentials: Option<ApiCredentials>,
}

impl OkxSource {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        credentials: Option<ApiCredentials>,
    ) -> Self {
        Self {
            venue: Venue::new("OKX"),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            credentials,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    // e.g. BTC/USDT -> "BTC-USDT"
    pub fn inst_id(pair: &Pair) -> String {
        format!("{}-{}", pair.base, pair.quote)
    }
}

/// Validate an OKX ticker body into a Quote.
pub fn parse_ticker(venue: &Venue, pair: &Pair, body: &str) -> Result<Quote, QuoteError> {
    let norm = Normaliser::new(venue, pair);
    let res: OkxTickerResponse =
        serde_json::from_str(body).map_err(|e| norm.malformed(format!("invalid JSON: {e}")))?;

    if res.code != "0" {
        return Err(QuoteError::Api {
            venue: venue.clone(),
            message: format!("code {}: {}", res.code, res.msg),
        });
    }
    let ticker = res
        .data
        .into_iter()
        .next()
        .ok_or_else(|| norm.malformed("empty data array".to_string()))?;
    if ticker.inst_id != OkxSource::inst_id(pair) {
        return Err(norm.malformed(format!(
            "ticker for {} instead of {}",
            ticker.inst_id,
            OkxSource::inst_id(pair)
        )));
    }

    norm.quote(&ticker.bid_px, &ticker.ask_px, norm.timestamp_ms(&ticker.ts))
}

#[async_trait]
impl QuoteSource for OkxSource {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    #[instrument(level = "debug", skip(self, pair), fields(venue = %self.venue, pair = %pair))]
    async fn fetch_quote(&self, pair: &Pair) -> Result<Quote, QuoteError> {
        let url = format!("{}/api/v5/market/ticker", self.base_url);
        let inst_id = Self::inst_id(pair);
        let query = [("instId", inst_id.as_str())];
        let body = get_text(&self.client, &self.venue, &url, &query).await?;
        let quote = parse_ticker(&self.venue, pair, &body)?;
        debug!(bid = %quote.bid, ask = %quote.ask, "OKX quote");
        Ok(quote)
    }
}
