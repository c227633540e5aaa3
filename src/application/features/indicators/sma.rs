use std::collections::VecDeque;

use crate::application::features::{FeatureGenerator, FeatureOutput, nan_padded};
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::{Frame, Row};

use super::purge_oldest;

/// Simple moving average over a trailing window.
///
/// The first `period - 1` outputs are NaN.
#[derive(Debug)]
pub struct Sma {
    input_col: String,
    period: usize,
    inputs: VecDeque<f64>,
    computed: VecDeque<f64>,
    initialized: bool,
}

impl Sma {
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
            initialized: false,
        })
    }

    fn push(&mut self, value: f64) {
        self.inputs.push_back(value);
        if self.inputs.len() >= self.period {
            let tail = self.inputs.iter().rev().take(self.period).copied();
            let mean = tail.sum::<f64>() / self.period as f64;
            self.computed.push_back(mean);
        }
    }

    #[cfg(test)]
    pub(crate) fn buffer_len(&self) -> usize {
        self.inputs.len()
    }
}

impl FeatureGenerator for Sma {
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
        format!("SMA__{}__{}", self.input_col, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_data() -> Frame {
        Frame::new().with_column("price", vec![1.0, 3.0, 2.0, 3.0, 5.0])
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            if e.is_nan() {
                assert!(a.is_nan(), "expected NaN, got {a}");
            } else {
                assert!((a - e).abs() < 1e-12, "expected {e}, got {a}");
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
    fn test_output_values() {
        let mut sma = Sma::new("price", 3).unwrap();
        sma.initialize(&sample_data()).unwrap();
        assert_close(
            &single(&sma),
            &[
                f64::NAN,
                f64::NAN,
                2.0,
                2.6666666666666665,
                3.333333333333333,
            ],
        );
    }

    #[test]
    fn test_add_value() {
        let mut sma = Sma::new("price", 3).unwrap();
        sma.initialize(&sample_data()).unwrap();
        sma.add_value(&Row::new().with("price", 10.0), false).unwrap();
        assert_close(
            &single(&sma),
            &[
                f64::NAN,
                f64::NAN,
                2.0,
                2.6666666666666665,
                3.333333333333333,
                6.0,
            ],
        );
    }

    #[test]
    fn test_append_matches_bulk_initialize() {
        let prices = vec![1.0, 3.0, 2.0, 3.0, 5.0, 4.0, 6.0, 7.0];
        for k in 3..prices.len() {
            let mut streamed = Sma::new("price", 3).unwrap();
            streamed
                .initialize(&Frame::new().with_column("price", prices[..k].to_vec()))
                .unwrap();
            for &p in &prices[k..] {
                streamed.add_value(&Row::new().with("price", p), false).unwrap();
            }

            let mut bulk = Sma::new("price", 3).unwrap();
            bulk.initialize(&Frame::new().with_column("price", prices.clone()))
                .unwrap();

            assert_close(&single(&streamed), &single(&bulk));
        }
    }

    #[test]
    fn test_purging_keeps_buffer_size_and_tail_values() {
        let prices = vec![1.0, 3.0, 2.0, 3.0, 5.0];
        let mut purged = Sma::new("price", 3).unwrap();
        purged
            .initialize(&Frame::new().with_column("price", prices.clone()))
            .unwrap();
        let mut plain = Sma::new("price", 3).unwrap();
        plain
            .initialize(&Frame::new().with_column("price", prices))
            .unwrap();

        let buffer_size = purged.buffer_len();
        for &p in &[4.0, 6.0, 7.0] {
            purged.add_value(&Row::new().with("price", p), true).unwrap();
            plain.add_value(&Row::new().with("price", p), false).unwrap();
            assert_eq!(purged.buffer_len(), buffer_size);
        }

        let purged_out = single(&purged);
        let plain_out = single(&plain);
        // Tail values agree; only the retained history length differs.
        let tail = &plain_out[plain_out.len() - purged_out.len() + 2..];
        assert_close(&purged_out[2..], tail);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut sma = Sma::new("price", 3).unwrap();
        assert!(matches!(
            sma.output_values(),
            Err(FeatureError::NotInitialized(_))
        ));
        assert!(matches!(
            sma.add_value(&Row::new().with("price", 1.0), false),
            Err(FeatureError::NotInitialized(_))
        ));
        sma.initialize(&sample_data()).unwrap();
        assert!(matches!(
            sma.initialize(&sample_data()),
            Err(FeatureError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(Sma::new("price", 0).is_err());
    }

    #[test]
    fn test_name() {
        assert_eq!(Sma::new("price", 3).unwrap().name(), "SMA__price__3");
    }
}
