use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput, nan_padded};
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::{Frame, Row};

use super::window_mean_std;

/// Shared rolling-band state: mean +/- multiplier * population std dev over
/// a trailing window.
#[derive(Debug)]
struct BandCore {
    input_col: String,
    period: usize,
    std_dev_multiplier: f64,
    inputs: VecDeque<f64>,
    lower: VecDeque<f64>,
    middle: VecDeque<f64>,
    upper: VecDeque<f64>,
    initialized: bool,
}

impl BandCore {
    fn new(input_col: &str, period: usize, std_dev_multiplier: f64) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::NonPositive {
                name: "period",
                value: period as f64,
            });
        }
        Ok(Self {
            input_col: input_col.to_string(),
            period,
            std_dev_multiplier,
            inputs: VecDeque::new(),
            lower: VecDeque::new(),
            middle: VecDeque::new(),
            upper: VecDeque::new(),
            initialized: false,
        })
    }

    fn push(&mut self, value: f64) {
        self.inputs.push_back(value);
        if self.inputs.len() >= self.period {
            let start = self.inputs.len() - self.period;
            let window = self.inputs.iter().skip(start).copied();
            let (mean, std) = window_mean_std(window, self.period);
            let delta = self.std_dev_multiplier * std;
            self.lower.push_back(mean - delta);
            self.middle.push_back(mean);
            self.upper.push_back(mean + delta);
        }
    }

    fn initialize(&mut self, data: &Frame, name: &str) -> Result<(), FeatureError> {
        if self.initialized {
            return Err(FeatureError::AlreadyInitialized(name.to_string()));
        }
        for &value in data.column(&self.input_col)? {
            self.push(value);
        }
        self.initialized = true;
        Ok(())
    }

    fn add_value(&mut self, row: &Row, purging: bool, name: &str) -> Result<(), FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(name.to_string()));
        }
        self.push(row.get(&self.input_col)?);
        if purging {
            self.inputs.pop_front();
            self.lower.pop_front();
            self.middle.pop_front();
            self.upper.pop_front();
        }
        Ok(())
    }
}

/// Bollinger bands: lower/middle/upper, warm-up of `period - 1`.
#[derive(Debug)]
pub struct BollingerBands {
    core: BandCore,
}

impl BollingerBands {
    pub fn new(input_col: &str, period: usize, std_dev_multiplier: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            core: BandCore::new(input_col, period, std_dev_multiplier)?,
        })
    }
}

impl FeatureGenerator for BollingerBands {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        let name = self.name();
        self.core.initialize(data, &name)
    }

    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        let name = self.name();
        self.core.add_value(row, purging, &name)
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.core.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        let pad = self.core.period - 1;
        Ok(FeatureOutput::Multi(vec![
            ("lower".to_string(), nan_padded(pad, &self.core.lower)),
            ("middle".to_string(), nan_padded(pad, &self.core.middle)),
            ("upper".to_string(), nan_padded(pad, &self.core.upper)),
        ]))
    }

    fn name(&self) -> String {
        format!("BB__{}", self.core.input_col)
    }
}

/// Bollinger band percentile: where the price sits within the band,
/// `(price - lower) / (upper - lower)`. Falls back to 0.5 when the band
/// width is exactly zero.
#[derive(Debug)]
pub struct BollingerPercentile {
    core: BandCore,
}

impl BollingerPercentile {
    pub fn new(input_col: &str, period: usize, std_dev_multiplier: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            core: BandCore::new(input_col, period, std_dev_multiplier)?,
        })
    }
}

impl FeatureGenerator for BollingerPercentile {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        let name = self.name();
        self.core.initialize(data, &name)
    }

    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        let name = self.name();
        self.core.add_value(row, purging, &name)
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.core.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        // Prices aligned with the computed band values: the band at output
        // index i was computed at the bar that sits `period - 1` into the
        // retained input buffer.
        let offset = self.inputs_offset();
        let percentile: Vec<f64> = self
            .core
            .lower
            .iter()
            .zip(self.core.upper.iter())
            .zip(self.core.inputs.iter().skip(offset))
            .map(|((&lower, &upper), &price)| {
                let width = upper - lower;
                if width == 0.0 {
                    0.5
                } else {
                    (price - lower) / width
                }
            })
            .collect();
        Ok(FeatureOutput::Single(nan_padded(
            self.core.period - 1,
            &percentile,
        )))
    }

    fn name(&self) -> String {
        format!(
            "BBP__{}__period_{}__std_mul_{}",
            self.core.input_col, self.core.period, self.core.std_dev_multiplier
        )
    }
}

impl BollingerPercentile {
    fn inputs_offset(&self) -> usize {
        // After purging, the input buffer may hold fewer leading warm-up
        // bars than `period - 1`; align from the back instead.
        self.core.inputs.len() - self.core.lower.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            if e.is_nan() {
                assert!(a.is_nan(), "expected NaN, got {a}");
            } else {
                assert!((a - e).abs() < 1e-9, "expected {e}, got {a}");
            }
        }
    }

    fn single(generator: &impl FeatureGenerator) -> Vec<f64> {
        match generator.output_values().unwrap() {
            FeatureOutput::Single(v) => v,
            FeatureOutput::Multi(_) => panic!("expected single output"),
        }
    }

    #[test]
    fn test_bands_shape_and_symmetry() {
        let mut bb = BollingerBands::new("price", 3, 2.0).unwrap();
        bb.initialize(&Frame::new().with_column("price", vec![1.0, 2.0, 3.5, 1.0, 5.0]))
            .unwrap();
        let FeatureOutput::Multi(outputs) = bb.output_values().unwrap() else {
            panic!("expected multi output");
        };
        assert_eq!(outputs.len(), 3);
        let (lower, middle, upper) = (&outputs[0].1, &outputs[1].1, &outputs[2].1);
        assert_eq!(lower.len(), 5);
        assert!(lower[0].is_nan() && lower[1].is_nan());
        for i in 2..5 {
            assert!((middle[i] - (lower[i] + upper[i]) / 2.0).abs() < 1e-12);
            assert!(upper[i] >= lower[i]);
        }
        // Middle band is the SMA.
        assert!((middle[2] - (1.0 + 2.0 + 3.5) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_values() {
        let mut bbp = BollingerPercentile::new("price", 3, 2.0).unwrap();
        bbp.initialize(&Frame::new().with_column("price", vec![1.0, 2.0, 3.5, 1.0, 5.0]))
            .unwrap();
        assert_close(
            &single(&bbp),
            &[
                f64::NAN,
                f64::NAN,
                0.8244428422615251,
                0.2161125130211656,
                0.7777919497518578,
            ],
        );
    }

    #[test]
    fn test_percentile_add_value() {
        let mut bbp = BollingerPercentile::new("price", 3, 2.0).unwrap();
        bbp.initialize(&Frame::new().with_column("price", vec![1.0, 2.0, 3.5, 1.0, 5.0]))
            .unwrap();
        bbp.add_value(&Row::new().with("price", 100.0), false).unwrap();
        let out = single(&bbp);
        assert!((out[5] - 0.8533281495061139).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_zero_width_band() {
        let mut bbp = BollingerPercentile::new("price", 3, 2.0).unwrap();
        bbp.initialize(&Frame::new().with_column("price", vec![1.0, 1.0, 1.0, 1.0, 1.0]))
            .unwrap();
        assert_close(&single(&bbp), &[f64::NAN, f64::NAN, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_percentile_name() {
        let bbp = BollingerPercentile::new("price", 3, 2.0).unwrap();
        assert_eq!(bbp.name(), "BBP__price__period_3__std_mul_2");
    }
}
