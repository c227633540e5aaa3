use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput, nan_padded};
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::{Frame, Row};

use super::purge_oldest;

/// Relative strength index with Wilder smoothing.
///
/// The first `period` outputs are NaN: the oscillator needs one extra prior
/// bar to form its first `period` price changes.
#[derive(Debug)]
pub struct Rsi {
    input_col: String,
    period: usize,
    inputs: VecDeque<f64>,
    computed: VecDeque<f64>,
    prev_input: Option<f64>,
    seed_gain: f64,
    seed_loss: f64,
    changes_seen: usize,
    avg_gain: Option<f64>,
    avg_loss: Option<f64>,
    initialized: bool,
}

impl Rsi {
    pub fn new(input_col: &str, period: usize) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::NonPositive {
                name: "period",
                value: period as f64,
            });
        }
        Ok(Self {
            input_col: input_col.to_string(),
            period,
            inputs: VecDeque::new(),
            computed: VecDeque::new(),
            prev_input: None,
            seed_gain: 0.0,
            seed_loss: 0.0,
            changes_seen: 0,
            avg_gain: None,
            avg_loss: None,
            initialized: false,
        })
    }

    fn push(&mut self, value: f64) {
        self.inputs.push_back(value);
        if let Some(prev) = self.prev_input {
            let change = value - prev;
            let gain = change.max(0.0);
            let loss = (-change).max(0.0);
            match (self.avg_gain, self.avg_loss) {
                (Some(avg_gain), Some(avg_loss)) => {
                    let p = self.period as f64;
                    let next_gain = (avg_gain * (p - 1.0) + gain) / p;
                    let next_loss = (avg_loss * (p - 1.0) + loss) / p;
                    self.avg_gain = Some(next_gain);
                    self.avg_loss = Some(next_loss);
                    self.computed.push_back(Self::rsi(next_gain, next_loss));
                }
                _ => {
                    self.seed_gain += gain;
                    self.seed_loss += loss;
                    self.changes_seen += 1;
                    if self.changes_seen == self.period {
                        let avg_gain = self.seed_gain / self.period as f64;
                        let avg_loss = self.seed_loss / self.period as f64;
                        self.avg_gain = Some(avg_gain);
                        self.avg_loss = Some(avg_loss);
                        self.computed.push_back(Self::rsi(avg_gain, avg_loss));
                    }
                }
            }
        }
        self.prev_input = Some(value);
    }

    fn rsi(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 {
            // Degenerate averages: flat history reads as neutral,
            // gain-only history as maximally overbought.
            if avg_gain == 0.0 { 50.0 } else { 100.0 }
        } else {
            let rs = avg_gain / avg_loss;
            100.0 - 100.0 / (1.0 + rs)
        }
    }
}

impl FeatureGenerator for Rsi {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        if self.initialized {
            return Err(FeatureError::AlreadyInitialized(self.name()));
        }
        for &value in data.column(&self.input_col)? {
            self.push(value);
        }
        self.initialized = true;
        Ok(())
    }

    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        self.push(row.get(&self.input_col)?);
        if purging {
            purge_oldest(&mut self.inputs, &mut self.computed);
        }
        Ok(())
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        Ok(FeatureOutput::Single(nan_padded(self.period, &self.computed)))
    }

    fn name(&self) -> String {
        format!("RSI__{}__{}", self.input_col, self.period)
    }
}
