use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput, nan_padded};
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::{Frame, Row};

use super::purge_oldest;

/// Average true range with Wilder smoothing, seeded with the simple average
/// of the first `period` true ranges. Warm-up of `period - 1`.
#[derive(Debug)]
pub struct Atr {
    high_col: String,
    low_col: String,
    close_col: String,
    period: usize,
    inputs: VecDeque<(f64, f64, f64)>,
    computed: VecDeque<f64>,
    prev_close: Option<f64>,
    seed_sum: f64,
    ranges_seen: usize,
    last_atr: Option<f64>,
    initialized: bool,
}

impl Atr {
    pub fn new(
        high_col: &str,
        low_col: &str,
        close_col: &str,
        period: usize,
    ) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::NonPositive {
                name: "period",
                value: period as f64,
            });
        }
        Ok(Self {
            high_col: high_col.to_string(),
            low_col: low_col.to_string(),
            close_col: close_col.to_string(),
            period,
            inputs: VecDeque::new(),
            computed: VecDeque::new(),
            prev_close: None,
            seed_sum: 0.0,
            ranges_seen: 0,
            last_atr: None,
            initialized: false,
        })
    }

    fn push(&mut self, high: f64, low: f64, close: f64) {
        let true_range = match self.prev_close {
            None => high - low,
            Some(prev) => (high - low)
                .max((high - prev).abs())
                .max((low - prev).abs()),
        };
        self.prev_close = Some(close);
        self.inputs.push_back((high, low, close));

        match self.last_atr {
            Some(prev) => {
                let p = self.period as f64;
                let atr = (prev * (p - 1.0) + true_range) / p;
                self.last_atr = Some(atr);
                self.computed.push_back(atr);
            }
            None => {
                self.seed_sum += true_range;
                self.ranges_seen += 1;
                if self.ranges_seen == self.period {
                    let atr = self.seed_sum / self.period as f64;
                    self.last_atr = Some(atr);
                    self.computed.push_back(atr);
                }
            }
        }
    }
}

impl FeatureGenerator for Atr {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        if self.initialized {
            return Err(FeatureError::AlreadyInitialized(self.name()));
        }
        let highs = data.column(&self.high_col)?.to_vec();
        let lows = data.column(&self.low_col)?.to_vec();
        let closes = data.column(&self.close_col)?.to_vec();
        for i in 0..data.len() {
            self.push(highs[i], lows[i], closes[i]);
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
        self.push(high, low, close);
        if purging {
            purge_oldest(&mut self.inputs, &mut self.computed);
        }
        Ok(())
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        Ok(FeatureOutput::Single(nan_padded(
            self.period - 1,
            &self.computed,
        )))
    }

    fn name(&self) -> String {
        format!("ATR__{}__{}", self.close_col, self.period)
    }
}
