//! Technical-indicator feature generators.
//!
//! Each indicator keeps an explicit bounded-or-unbounded deque of consumed
//! raw values plus a deque of computed outputs; purging pops the front of
//! both so the warm-up NaN prefix length stays constant while retained
//! history shrinks.

mod atr;
mod bollinger;
mod ema;
mod macd;
mod obv;
mod rsi;
mod sma;
mod vwap;

pub use atr::Atr;
pub use bollinger::{BollingerBands, BollingerPercentile};
pub use ema::Ema;
pub use macd::Macd;
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::Sma;
pub use vwap::Vwap;

use std::collections::VecDeque;

/// Mean and population standard deviation over a trailing window.
pub(crate) fn window_mean_std(window: impl Iterator<Item = f64> + Clone, len: usize) -> (f64, f64) {
    let mean = window.clone().sum::<f64>() / len as f64;
    let var = window.map(|v| (v - mean).powi(2)).sum::<f64>() / len as f64;
    (mean, var.sqrt())
}

/// Drops the oldest raw observation and the oldest computed output.
pub(crate) fn purge_oldest<T>(inputs: &mut VecDeque<T>, computed: &mut VecDeque<f64>) {
    inputs.pop_front();
    computed.pop_front();
}
