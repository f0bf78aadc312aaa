// Source: GET https://www.okx.com/api/v5/market/ticker?instId=BTC-USDT
#[derive(Debug, serde::Deserialize)]
pub struct OkxTickerResponse {
    pub code: String, // "0" on success
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub data: Vec<OkxTicker>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OkxTicker {
    pub inst_id: String,
    pub ask_px: String, // "" when the book side is empty
    pub bid_px: String,
    #[serde(default)]
    pub ts: String, // ms since epoch
    // we ignore the other fields (last, vol24h, ...)
}
