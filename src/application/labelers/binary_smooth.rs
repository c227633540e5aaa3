use crate::application::labelers::Labeler;
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::Frame;

/// Smoothed up/down label: 1.0 when the mean price over the next `period`
/// bars strictly exceeds the current price. Less sensitive to single-bar
/// spikes than [`super::BinaryLabeler`].
#[derive(Debug)]
pub struct BinarySmoothLabeler {
    price_col: String,
    period: usize,
}

impl BinarySmoothLabeler {
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

impl Labeler for BinarySmoothLabeler {
    fn transform(&self, data: &Frame) -> Result<Vec<f64>, FeatureError> {
        let prices = data.column(&self.price_col)?;
        if prices.len() < self.period {
            return Err(FeatureError::InsufficientData {
                needed: self.period,
                got: prices.len(),
            });
        }
        let mut labels = Vec::with_capacity(prices.len());
        // Running sum over prices[t+1..=t+period], advanced one bar at a time.
        let mut window_sum: f64 = prices[1..=self.period.min(prices.len() - 1)].iter().sum();
        for t in 0..prices.len() - self.period {
            let mean = window_sum / self.period as f64;
            labels.push(if mean > prices[t] { 1.0 } else { 0.0 });
            window_sum -= prices[t + 1];
            if t + self.period + 1 < prices.len() {
                window_sum += prices[t + self.period + 1];
            }
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
        let labeler = BinarySmoothLabeler::new("close", 2).unwrap();
        let labels = labeler
            .transform(&Frame::new().with_column("close", vec![1.0, 2.0, 3.0, 4.0, 5.0]))
            .unwrap();
        assert_eq!(&labels[..3], &[1.0, 1.0, 1.0]);
        assert!(labels[3].is_nan() && labels[4].is_nan());
    }

    #[test]
    fn test_spike_smoothed_out() {
        // Single spike at t+1 but the two-bar mean stays below the current price.
        let labeler = BinarySmoothLabeler::new("close", 2).unwrap();
        let labels = labeler
            .transform(&Frame::new().with_column("close", vec![5.0, 9.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(&labels[..2], &[0.0, 0.0]);
    }

    #[test]
    fn test_matches_naive_mean() {
        let prices: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let period = 4;
        let labeler = BinarySmoothLabeler::new("close", period).unwrap();
        let labels = labeler
            .transform(&Frame::new().with_column("close", prices.clone()))
            .unwrap();
        for t in 0..prices.len() - period {
            let mean: f64 =
                prices[t + 1..=t + period].iter().sum::<f64>() / period as f64;
            let expected = if mean > prices[t] { 1.0 } else { 0.0 };
            assert_eq!(labels[t], expected, "mismatch at t={t}");
        }
    }
}
