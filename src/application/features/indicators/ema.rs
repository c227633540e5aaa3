use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput, nan_padded};
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::{Frame, Row};

use super::purge_oldest;

/// Streaming exponential moving average state, seeded with the simple
/// average of the first `period` inputs. Shared by [`Ema`] and the MACD
/// sub-components.
#[derive(Debug, Clone)]
pub(crate) struct EmaState {
    period: usize,
    seed_sum: f64,
    seen: usize,
    last: Option<f64>,
}

impl EmaState {
    pub(crate) fn new(period: usize) -> Self {
        Self {
            period,
            seed_sum: 0.0,
            seen: 0,
            last: None,
        }
    }

    /// Feeds one value; returns the EMA once enough history exists.
    pub(crate) fn update(&mut self, value: f64) -> Option<f64> {
        self.seen += 1;
        let next = match self.last {
            Some(prev) => {
                let k = 2.0 / (self.period as f64 + 1.0);
                Some(prev + k * (value - prev))
            }
            None => {
                self.seed_sum += value;
                (self.seen == self.period).then(|| self.seed_sum / self.period as f64)
            }
        };
        if next.is_some() {
            self.last = next;
        }
        next
    }
}

/// Exponential moving average; first `period - 1` outputs are NaN.
#[derive(Debug)]
pub struct Ema {
    input_col: String,
    period: usize,
    inputs: VecDeque<f64>,
    computed: VecDeque<f64>,
    state: EmaState,
    initialized: bool,
}

impl Ema {
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
            state: EmaState::new(period),
            initialized: false,
        })
    }

    fn push(&mut self, value: f64) {
        self.inputs.push_back(value);
        if let Some(ema) = self.state.update(value) {
            self.computed.push_back(ema);
        }
    }
}

impl FeatureGenerator for Ema {
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
        Ok(FeatureOutput::Single(nan_padded(
            self.period - 1,
            &self.computed,
        )))
    }

    fn name(&self) -> String {
        format!("EMA__{}__{}", self.input_col, self.period)
    }
}
