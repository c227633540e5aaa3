use crate::application::labelers::Labeler;
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::Frame;

/// Up/down label over a fixed horizon: 1.0 when the price `period` bars ahead
/// is strictly greater than the current price, 0.0 otherwise.
#[derive(Debug)]
pub struct BinaryLabeler {
    price_col: String,
    period: usize,
}

impl BinaryLabeler {
    pub fn new(price_col: &str, period: usize) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::NonPositive {
                name: "period",
                value: period as f64,
            });
        }
        Ok(Self {
            price_col: price_col.to_string(),
            period,
        })
    }
}

impl Labeler for BinaryLabeler {
    fn transform(&self, data: &Frame) -> Result<Vec<f64>, FeatureError> {
        let prices = data.column(&self.price_col)?;
        if prices.len() < self.period {
            return Err(FeatureError::InsufficientData {
                needed: self.period,
                got: prices.len(),
            });
        }
        let mut labels = Vec::with_capacity(prices.len());
        for t in 0..prices.len() - self.period {
            labels.push(if prices[t + self.period] > prices[t] {
                1.0
            } else {
                0.0
            });
        }
        labels.extend(std::iter::repeat_n(f64::NAN, self.period));
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform() {
        let labeler = BinaryLabeler::new("close", 2).unwrap();
        let labels = labeler
            .transform(&Frame::new().with_column("close", vec![1.0, 5.0, 3.0, 2.0, 4.0]))
            .unwrap();
        assert_eq!(&labels[..3], &[1.0, 0.0, 1.0]);
        assert!(labels[3].is_nan() && labels[4].is_nan());
    }

    #[test]
    fn test_equal_price_is_down() {
        let labeler = BinaryLabeler::new("close", 1).unwrap();
        let labels = labeler
            .transform(&Frame::new().with_column("close", vec![2.0, 2.0]))
            .unwrap();
        assert_eq!(labels[0], 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        let labeler = BinaryLabeler::new("close", 5).unwrap();
        let err = labeler
            .transform(&Frame::new().with_column("close", vec![1.0, 2.0]))
            .unwrap_err();
        assert!(matches!(
            err,
            FeatureError::InsufficientData { needed: 5, got: 2 }
        ));
    }

    #[test]
    fn test_zero_period_rejected() {
        assert!(BinaryLabeler::new("close", 0).is_err());
    }
}
