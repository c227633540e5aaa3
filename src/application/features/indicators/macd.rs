use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput, nan_padded};
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::{Frame, Row};

use super::ema::EmaState;

/// Moving average convergence/divergence: fast EMA minus slow EMA, plus a
/// signal EMA over the line and their histogram difference.
///
/// The line is defined from index `slow_period - 1`; signal and histogram
/// stay NaN for a further `signal_period - 1` bars.
#[derive(Debug)]
pub struct Macd {
    input_col: String,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
    inputs: VecDeque<f64>,
    line: VecDeque<f64>,
    signal: VecDeque<f64>,
    histogram: VecDeque<f64>,
    fast: EmaState,
    slow: EmaState,
    signal_state: EmaState,
    initialized: bool,
}

impl Macd {
    pub fn new(
        input_col: &str,
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, ConfigError> {
        for (name, period) in [
            ("fast_period", fast_period),
            ("slow_period", slow_period),
            ("signal_period", signal_period),
        ] {
            if period == 0 {
                return Err(ConfigError::NonPositive {
                    name,
                    value: period as f64,
                });
            }
        }
        Ok(Self {
            input_col: input_col.to_string(),
            fast_period,
            slow_period,
            signal_period,
            inputs: VecDeque::new(),
            line: VecDeque::new(),
            signal: VecDeque::new(),
            histogram: VecDeque::new(),
            fast: EmaState::new(fast_period),
            slow: EmaState::new(slow_period),
            signal_state: EmaState::new(signal_period),
            initialized: false,
        })
    }

    fn push(&mut self, value: f64) {
        self.inputs.push_back(value);
        let fast = self.fast.update(value);
        let slow = self.slow.update(value);
        if let (Some(fast), Some(slow)) = (fast, slow) {
            let line = fast - slow;
            self.line.push_back(line);
            match self.signal_state.update(line) {
                Some(signal) => {
                    self.signal.push_back(signal);
                    self.histogram.push_back(line - signal);
                }
                None => {
                    self.signal.push_back(f64::NAN);
                    self.histogram.push_back(f64::NAN);
                }
            }
        }
    }
}

impl FeatureGenerator for Macd {
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
            self.inputs.pop_front();
            self.line.pop_front();
            self.signal.pop_front();
            self.histogram.pop_front();
        }
        Ok(())
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        let pad = self.slow_period - 1;
        Ok(FeatureOutput::Multi(vec![
            ("line".to_string(), nan_padded(pad, &self.line)),
            ("signal".to_string(), nan_padded(pad, &self.signal)),
            ("histogram".to_string(), nan_padded(pad, &self.histogram)),
        ]))
    }

    fn name(&self) -> String {
        format!(
            "MACD__{}__fast_{}__slow_{}__signal_{}",
            self.input_col, self.fast_period, self.slow_period, self.signal_period
        )
    }
}
