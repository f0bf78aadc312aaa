use std::collections::HashMap;

// Source: GET https://api.kraken.com/0/public/Ticker?pair=XBTUSDT
#[derive(Debug, serde::Deserialize)]
pub struct KrakenTickerResponse {
    #[serde(default)]
    pub error: Vec<String>,
    // keyed by Kraken's own pair name, which may differ from the one requested
    pub result: Option<HashMap<String, KrakenTicker>>,
}

#[derive(Debug, serde::Deserialize)]
pub struct KrakenTicker {
    pub a: Vec<String>, // ask: [price, whole lot volume, lot volume]
    pub b: Vec<String>, // bid: [price, whole lot volume, lot volume]
    // we ignore the other fields (c, v, p, t, l, h, o)
}
