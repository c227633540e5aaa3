use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::types::{Frame, Row};

use super::purge_oldest;

/// On-balance volume: cumulative volume signed by the close-to-close
/// direction. Defined from the very first bar (no warm-up), starting at the
/// first bar's volume.
#[derive(Debug)]
pub struct Obv {
    close_col: String,
    volume_col: String,
    inputs: VecDeque<(f64, f64)>,
    computed: VecDeque<f64>,
    prev_close: Option<f64>,
    last_obv: f64,
    initialized: bool,
}

impl Obv {
    pub fn new(close_col: &str, volume_col: &str) -> Self {
        Self {
            close_col: close_col.to_string(),
            volume_col: volume_col.to_string(),
            inputs: VecDeque::new(),
            computed: VecDeque::new(),
            prev_close: None,
            last_obv: 0.0,
            initialized: false,
        }
    }

    fn push(&mut self, close: f64, volume: f64) {
        let obv = match self.prev_close {
            None => volume,
            Some(prev) => {
                if close > prev {
                    self.last_obv + volume
                } else if close < prev {
                    self.last_obv - volume
                } else {
                    self.last_obv
                }
            }
        };
        self.inputs.push_back((close, volume));
        self.computed.push_back(obv);
        self.last_obv = obv;
        self.prev_close = Some(close);
    }
}

impl FeatureGenerator for Obv {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        if self.initialized {
            return Err(FeatureError::AlreadyInitialized(self.name()));
        }
        let closes = data.column(&self.close_col)?.to_vec();
        let volumes = data.column(&self.volume_col)?.to_vec();
        for (&close, &volume) in closes.iter().zip(volumes.iter()) {
            self.push(close, volume);
        }
        self.initialized = true;
        Ok(())
    }

    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        let close = row.get(&self.close_col)?;
        let volume = row.get(&self.volume_col)?;
        self.push(close, volume);
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
        format!("OBV__{}", self.close_col)
    }
}
