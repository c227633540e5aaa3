//! Binance market data client.
//!
//! Fetches historical klines over the public REST API, paginating past the
//! per-request row limit.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::BinanceConfig;
use crate::domain::types::Candle;

const KLINES_LIMIT: usize = 1000;

pub struct BinanceMarketData {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceMarketData {
    pub fn new(config: BinanceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url,
        }
    }

    /// Candles for `symbol` at `interval`, ordered by open time ascending,
    /// covering the half-open range `[start_ms, end_ms)`.
    pub async fn get_historic_prices(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let mut candles: Vec<Candle> = Vec::new();
        let mut cursor = start_ms;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("symbol", symbol),
                    ("interval", interval),
                    ("startTime", &cursor.to_string()),
                    // endTime is inclusive upstream; subtract one for [start, end).
                    ("endTime", &(end_ms - 1).to_string()),
                    ("limit", &KLINES_LIMIT.to_string()),
                ])
                .send()
                .await
                .context("Failed to fetch klines from Binance")?;

            if !response.status().is_success() {
                let error_text = response.text().await.unwrap_or_default();
                anyhow::bail!("Binance klines fetch failed: {}", error_text);
            }

            let klines: Vec<serde_json::Value> = response
                .json()
                .await
                .context("Failed to parse Binance klines response")?;
            let page_len = klines.len();

            for kline in klines {
                candles.push(parse_kline(&kline)?);
            }

            match candles.last() {
                Some(last) if page_len == KLINES_LIMIT && last.close_timestamp < end_ms - 1 => {
                    cursor = last.close_timestamp + 1;
                }
                _ => break,
            }
        }

        info!(symbol, interval, bars = candles.len(), "fetched klines");
        Ok(candles)
    }
}

// Kline format: [open_time, open, high, low, close, volume, close_time,
// quote_volume, trade_count, taker_buy_base, taker_buy_quote, ignore]
fn parse_kline(kline: &serde_json::Value) -> Result<Candle> {
    let arr = kline
        .as_array()
        .filter(|a| a.len() >= 11)
        .context("kline row is not an 11-field array")?;
    let int = |i: usize| -> Result<i64> {
        arr[i]
            .as_i64()
            .with_context(|| format!("kline field {i} is not an integer"))
    };
    let num = |i: usize| -> Result<f64> {
        arr[i]
            .as_str()
            .with_context(|| format!("kline field {i} is not a string"))?
            .parse::<f64>()
            .with_context(|| format!("kline field {i} is not numeric"))
    };
    Ok(Candle {
        open_timestamp: int(0)?,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
        close_timestamp: int(6)?,
        quote_asset_volume: num(7)?,
        number_of_trades: int(8)? as u64,
        taker_buy_base_volume: num(9)?,
        taker_buy_quote_volume: num(10)?,
    })
}
