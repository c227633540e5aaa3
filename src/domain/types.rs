use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::errors::FeatureError;

/// Well-known column names shared by the data loaders and feature generators.
pub mod columns {
    pub const OPEN_TIMESTAMP: &str = "open_timestamp";
    pub const OPEN: &str = "open";
    pub const HIGH: &str = "high";
    pub const LOW: &str = "low";
    pub const CLOSE: &str = "close";
    pub const VOLUME: &str = "volume";
    pub const CLOSE_TIMESTAMP: &str = "close_timestamp";
    pub const QUOTE_ASSET_VOLUME: &str = "quote_asset_volume";
    pub const NUMBER_OF_TRADES: &str = "number_of_trades";
    pub const TAKER_BUY_BASE_VOLUME: &str = "taker_buy_base_volume";
    pub const TAKER_BUY_QUOTE_VOLUME: &str = "taker_buy_quote_volume";
}

/// One aggregated price/volume bar, as returned by the exchange kline API.
///
/// Timestamps are UTC milliseconds. The open timestamp is the start of the
/// bar interval, the close timestamp its last millisecond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_timestamp: i64,
    pub quote_asset_volume: f64,
    pub number_of_trades: u64,
    pub taker_buy_base_volume: f64,
    pub taker_buy_quote_volume: f64,
}

impl Candle {
    /// Flattens the candle into a single observation row for streaming
    /// feature updates. Timestamps are carried as f64 (exact below 2^53).
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.set(columns::OPEN_TIMESTAMP, self.open_timestamp as f64);
        row.set(columns::OPEN, self.open);
        row.set(columns::HIGH, self.high);
        row.set(columns::LOW, self.low);
        row.set(columns::CLOSE, self.close);
        row.set(columns::VOLUME, self.volume);
        row.set(columns::CLOSE_TIMESTAMP, self.close_timestamp as f64);
        row.set(columns::QUOTE_ASSET_VOLUME, self.quote_asset_volume);
        row.set(columns::NUMBER_OF_TRADES, self.number_of_trades as f64);
        row.set(columns::TAKER_BUY_BASE_VOLUME, self.taker_buy_base_volume);
        row.set(columns::TAKER_BUY_QUOTE_VOLUME, self.taker_buy_quote_volume);
        row
    }
}

/// A name-keyed table of equally long f64 columns.
///
/// Column iteration order is the sorted key order, which keeps downstream
/// flattened feature tables deterministic.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    cols: BTreeMap<String, Vec<f64>>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut frame = Self::new();
        frame.insert(
            columns::OPEN_TIMESTAMP,
            candles.iter().map(|c| c.open_timestamp as f64).collect(),
        );
        frame.insert(columns::OPEN, candles.iter().map(|c| c.open).collect());
        frame.insert(columns::HIGH, candles.iter().map(|c| c.high).collect());
        frame.insert(columns::LOW, candles.iter().map(|c| c.low).collect());
        frame.insert(columns::CLOSE, candles.iter().map(|c| c.close).collect());
        frame.insert(columns::VOLUME, candles.iter().map(|c| c.volume).collect());
        frame.insert(
            columns::CLOSE_TIMESTAMP,
            candles.iter().map(|c| c.close_timestamp as f64).collect(),
        );
        frame.insert(
            columns::QUOTE_ASSET_VOLUME,
            candles.iter().map(|c| c.quote_asset_volume).collect(),
        );
        frame.insert(
            columns::NUMBER_OF_TRADES,
            candles.iter().map(|c| c.number_of_trades as f64).collect(),
        );
        frame.insert(
            columns::TAKER_BUY_BASE_VOLUME,
            candles.iter().map(|c| c.taker_buy_base_volume).collect(),
        );
        frame.insert(
            columns::TAKER_BUY_QUOTE_VOLUME,
            candles.iter().map(|c| c.taker_buy_quote_volume).collect(),
        );
        frame
    }

    pub fn insert(&mut self, name: &str, values: Vec<f64>) {
        self.cols.insert(name.to_string(), values);
    }

    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Self {
        self.insert(name, values);
        self
    }

    pub fn column(&self, name: &str) -> Result<&[f64], FeatureError> {
        self.cols
            .get(name)
            .map(|v| v.as_slice())
            .ok_or_else(|| FeatureError::MissingColumn(name.to_string()))
    }

    /// Number of rows (length of the first column, 0 for an empty frame).
    pub fn len(&self) -> usize {
        self.cols.values().next().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.cols.keys().map(|k| k.as_str())
    }
}

/// A single observation: one value per column.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: BTreeMap<String, f64>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Result<f64, FeatureError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| FeatureError::MissingColumn(name.to_string()))
    }
}
