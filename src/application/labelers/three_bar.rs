use crate::application::labelers::Labeler;
use crate::domain::errors::{ConfigError, FeatureError};
use crate::domain::types::Frame;

/// Sell/hold/buy label from the percentage change over a fixed horizon:
/// 0 below `-threshold_pct`, 1 within the inclusive band, 2 above
/// `threshold_pct`.
#[derive(Debug)]
pub struct ThreeBarLabeler {
    price_col: String,
    period: usize,
    threshold_pct: f64,
}

impl ThreeBarLabeler {
    pub fn new(price_col: &str, period: usize, threshold_pct: f64) -> Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::NonPositive {
                name: "period",
                value: period as f64,
            });
        }
        if threshold_pct <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "threshold_pct",
                value: threshold_pct,
            });
        }
        Ok(Self {
            price_col: price_col.to_string(),
            period,
            threshold_pct,
        })
    }
}

impl Labeler for ThreeBarLabeler {
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
            let pct_change = 100.0 * prices[t + self.period] / prices[t] - 100.0;
            let label = if pct_change < -self.threshold_pct {
                0.0
            } else if pct_change > self.threshold_pct {
                2.0
            } else {
                1.0
            };
            labels.push(label);
        }
        labels.extend(std::iter::repeat_n(f64::NAN, self.period));
        Ok(labels)
    }
}
