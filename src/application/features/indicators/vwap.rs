use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::types::{Frame, Row};

use super::purge_oldest;

/// Volume-weighted average price, cumulative over the whole consumed
/// stream: `sum(typical_price * volume) / sum(volume)` with
/// `typical_price = (high + low + close) / 3`. No warm-up.
#[derive(Debug)]
pub struct Vwap {
    high_col: String,
    low_col: String,
    close_col: String,
    volume_col: String,
    inputs: VecDeque<(f64, f64, f64, f64)>,
    computed: VecDeque<f64>,
    sum_price_volume: f64,
    sum_volume: f64,
    initialized: bool,
}

impl Vwap {
    pub fn new(high_col: &str, low_col: &str, close_col: &str, volume_col: &str) -> Self {
        Self {
            high_col: high_col.to_string(),
            low_col: low_col.to_string(),
            close_col: close_col.to_string(),
            volume_col: volume_col.to_string(),
            inputs: VecDeque::new(),
            computed: VecDeque::new(),
            sum_price_volume: 0.0,
            sum_volume: 0.0,
            initialized: false,
        }
    }

    fn push(&mut self, high: f64, low: f64, close: f64, volume: f64) {
        let typical = (high + low + close) / 3.0;
        self.sum_price_volume += typical * volume;
        self.sum_volume += volume;
        self.inputs.push_back((high, low, close, volume));
        // With no volume traded yet the ratio is 0/0; fall back to the
        // previous value, or the typical price on the first bar.
        let value = if self.sum_volume > 0.0 {
            self.sum_price_volume / self.sum_volume
        } else {
            self.computed.back().copied().unwrap_or(typical)
        };
        self.computed.push_back(value);
    }
}

impl FeatureGenerator for Vwap {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        if self.initialized {
            return Err(FeatureError::AlreadyInitialized(self.name()));
        }
        let highs = data.column(&self.high_col)?.to_vec();
        let lows = data.column(&self.low_col)?.to_vec();
        let closes = data.column(&self.close_col)?.to_vec();
        let volumes = data.column(&self.volume_col)?.to_vec();
        for i in 0..data.len() {
            self.push(highs[i], lows[i], closes[i], volumes[i]);
        }
        self.initialized = true;
        Ok(())
    }

    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        let high = row.get(&self.high_col)?;
        let low = row.get(&self.low_col)?;
        let close = row.get(&self.close_col)?;
        let volume = row.get(&self.volume_col)?;
        self.push(high, low, close, volume);
        if purging {
            purge_oldest(&mut self.inputs, &mut self.computed);
        }
        Ok(())
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        Ok(FeatureOutput::Single(self.computed.iter().copied().collect()))
    }

    fn name(&self) -> String {
        format!("VWAP__{}", self.close_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Frame {
        Frame::new()
            .with_column("high", vec![3.0, 6.0])
            .with_column("low", vec![1.0, 2.0])
            .with_column("close", vec![2.0, 4.0])
            .with_column("volume", vec![10.0, 30.0])
    }

    #[test]
    fn test_cumulative_average() {
        let mut vwap = Vwap::new("high", "low", "close", "volume");
        vwap.initialize(&sample_data()).unwrap();
        let FeatureOutput::Single(out) = vwap.output_values().unwrap() else {
            panic!("expected single output");
        };
        // Typical prices: 2 and 4; vwap = 2, then (2*10 + 4*30) / 40 = 3.5.
        assert_eq!(out, vec![2.0, 3.5]);
    }

    #[test]
    fn test_add_value() {
        let mut vwap = Vwap::new("high", "low", "close", "volume");
        vwap.initialize(&sample_data()).unwrap();
        let row = Row::new()
            .with("high", 9.0)
            .with("low", 3.0)
            .with("close", 6.0)
            .with("volume", 10.0);
        vwap.add_value(&row, false).unwrap();
        let FeatureOutput::Single(out) = vwap.output_values().unwrap() else {
            panic!("expected single output");
        };
        // (2*10 + 4*30 + 6*10) / 50 = 4.0
        assert_eq!(out.last(), Some(&4.0));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_zero_volume_prefix_stays_defined() {
        let data = Frame::new()
            .with_column("high", vec![3.0, 6.0, 6.0])
            .with_column("low", vec![1.0, 2.0, 2.0])
            .with_column("close", vec![2.0, 4.0, 4.0])
            .with_column("volume", vec![0.0, 0.0, 40.0]);
        let mut vwap = Vwap::new("high", "low", "close", "volume");
        vwap.initialize(&data).unwrap();
        let FeatureOutput::Single(out) = vwap.output_values().unwrap() else {
            panic!("expected single output");
        };
        // Typical prices: 2, 4, 4. No volume through the first two bars, so
        // the first value is the typical price and carries forward; real
        // volume-weighting starts on the third bar.
        assert_eq!(out, vec![2.0, 2.0, 4.0]);
    }

    #[test]
    fn test_name() {
        assert_eq!(Vwap::new("h", "l", "c", "v").name(), "VWAP__c");
    }
}
