use anyhow::{Context, Result};
use ndarray::{ArrayView1, ArrayView2, s};
use tracing::info;

use crate::application::ml::Estimator;
use crate::domain::errors::ConfigError;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    /// Fraction of each split left unused between train and validation,
    /// absorbing indicator-lookback bleed across the boundary.
    pub gap_proportion: f64,
    pub valid_proportion: f64,
    pub n_splits: usize,
    pub n_epochs: usize,
}

/// Aggregated out-of-sample results: every fold's truth and predictions
/// concatenated in fold order.
#[derive(Debug)]
pub struct BacktestReport {
    pub y_true: Vec<f64>,
    pub y_pred_proba: Vec<f64>,
}

/// Walk-forward backtest over a single ordered series. The series is cut
/// into `n_splits` overlapping folds, each a train / gap / validation
/// partition; folds advance strictly forward in time. The estimator is
/// reset before every fold so no gradient or optimizer state leaks between
/// folds.
pub struct Backtester<'a, F>
where
    F: FnMut(&[f64], &[f64]),
{
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    estimator: &'a mut Estimator,
    evaluation_fn: F,
    config: BacktestConfig,
    train_proportion: f64,
}

impl<'a, F> Backtester<'a, F>
where
    F: FnMut(&[f64], &[f64]),
{
    pub fn new(
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        estimator: &'a mut Estimator,
        evaluation_fn: F,
        config: BacktestConfig,
    ) -> Result<Self, ConfigError> {
        if config.gap_proportion + config.valid_proportion >= 1.0 {
            return Err(ConfigError::InvalidProportions {
                gap: config.gap_proportion,
                valid: config.valid_proportion,
            });
        }
        if config.n_splits == 0 {
            return Err(ConfigError::NonPositive {
                name: "n_splits",
                value: config.n_splits as f64,
            });
        }
        if config.n_epochs == 0 {
            return Err(ConfigError::NonPositive {
                name: "n_epochs",
                value: config.n_epochs as f64,
            });
        }
        let train_proportion = 1.0 - config.gap_proportion - config.valid_proportion;
        let backtester = Self {
            x,
            y,
            estimator,
            evaluation_fn,
            config,
            train_proportion,
        };
        if backtester.train_length() == 0 {
            return Err(ConfigError::NonPositive {
                name: "train_length",
                value: backtester.train_length() as f64,
            });
        }
        if backtester.valid_length() == 0 {
            return Err(ConfigError::NonPositive {
                name: "valid_length",
                value: backtester.valid_length() as f64,
            });
        }
        Ok(backtester)
    }

    /// Fold length such that `n_splits` folds with stride `step_size`
    /// exactly tile the series.
    pub fn split_length(&self) -> usize {
        let t = self.x.nrows() as f64;
        (t / (1.0 + (self.config.n_splits - 1) as f64 * self.config.valid_proportion)) as usize
    }

    pub fn step_size(&self) -> usize {
        (self.split_length() as f64 * self.config.valid_proportion) as usize
    }

    pub fn train_length(&self) -> usize {
        (self.train_proportion * self.split_length() as f64) as usize
    }

    pub fn gap_length(&self) -> usize {
        (self.config.gap_proportion * self.split_length() as f64) as usize
    }

    pub fn valid_length(&self) -> usize {
        (self.config.valid_proportion * self.split_length() as f64) as usize
    }

    /// Index ranges `(train_start, train_end, valid_start, valid_end)` of
    /// fold `i`.
    pub fn split_ranges(&self, i: usize) -> (usize, usize, usize, usize) {
        let train_start = self.step_size() * i;
        let train_end = train_start + self.train_length();
        let valid_start = train_end + self.gap_length();
        let valid_end = train_start + self.split_length();
        (train_start, train_end, valid_start, valid_end)
    }

    pub fn run(mut self) -> Result<BacktestReport> {
        let mut y_true = Vec::new();
        let mut y_pred_proba = Vec::new();

        for i in 0..self.config.n_splits {
            let (train_start, train_end, valid_start, valid_end) = self.split_ranges(i);
            info!(
                fold = i,
                train_start, train_end, valid_start, valid_end, "running fold"
            );

            self.estimator
                .reset_model()
                .with_context(|| format!("resetting estimator before fold {i}"))?;

            let x_train = self.x.slice(s![train_start..train_end, ..]);
            let y_train = self.y.slice(s![train_start..train_end]);
            let x_valid = self.x.slice(s![valid_start..valid_end, ..]);
            let y_valid = self.y.slice(s![valid_start..valid_end]);

            self.estimator
                .fit(
                    x_train,
                    y_train,
                    Some((x_valid.view(), y_valid.view())),
                    self.config.n_epochs,
                )
                .with_context(|| format!("fitting fold {i}"))?;

            let predictions = self
                .estimator
                .predict(x_valid)
                .with_context(|| format!("predicting fold {i}"))?;
            let truth: Vec<f64> = self
                .estimator
                .align_targets(y_valid, predictions.len())
                .iter()
                .copied()
                .collect();
            let predictions = predictions.to_vec();

            (self.evaluation_fn)(&truth, &predictions);

            y_true.extend(truth);
            y_pred_proba.extend(predictions);
        }

        info!(folds = self.config.n_splits, "aggregate evaluation");
        (self.evaluation_fn)(&y_true, &y_pred_proba);
        Ok(BacktestReport {
            y_true,
            y_pred_proba,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::{EstimatorConfig, WindowMlp};
    use ndarray::{Array1, Array2};

    fn estimator() -> Estimator {
        let config = EstimatorConfig {
            batch_size: 32,
            seq_len: 4,
            learning_rate: 0.01,
            ..EstimatorConfig::default()
        };
        let model = WindowMlp::new(config.seq_len * 2, 8, 3);
        Estimator::new(Box::new(model), config).unwrap()
    }

    fn series(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i * (j + 1)) as f64 * 0.1).sin());
        let y = Array1::from_shape_fn(n, |i| if i % 3 == 0 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn config(n_splits: usize) -> BacktestConfig {
        BacktestConfig {
            gap_proportion: 0.2,
            valid_proportion: 0.3,
            n_splits,
            n_epochs: 1,
        }
    }

    #[test]
    fn test_split_math_single_fold() {
        let (x, y) = series(1000);
        let mut est = estimator();
        let bt = Backtester::new(x.view(), y.view(), &mut est, |_, _| {}, config(1)).unwrap();
        assert_eq!(bt.split_length(), 1000);
        assert_eq!(bt.train_length(), 500);
        assert_eq!(bt.gap_length(), 200);
        assert_eq!(bt.valid_length(), 300);
        assert_eq!(bt.split_ranges(0), (0, 500, 700, 1000));
    }

    #[test]
    fn test_split_math_two_folds() {
        let (x, y) = series(1000);
        let mut est = estimator();
        let bt = Backtester::new(x.view(), y.view(), &mut est, |_, _| {}, config(2)).unwrap();
        assert_eq!(bt.split_length(), 769);
        assert_eq!(bt.step_size(), 230);
        assert_eq!(bt.train_length(), 384);
        assert_eq!(bt.gap_length(), 153);
        assert_eq!(bt.valid_length(), 230);
        assert_eq!(bt.split_ranges(0), (0, 384, 537, 769));
        assert_eq!(bt.split_ranges(1), (230, 614, 767, 999));
    }

    #[test]
    fn test_validation_fatality() {
        let (x, y) = series(100);
        let mut est = estimator();
        let bad = BacktestConfig {
            gap_proportion: 0.5,
            valid_proportion: 0.5,
            n_splits: 1,
            n_epochs: 1,
        };
        assert!(matches!(
            Backtester::new(x.view(), y.view(), &mut est, |_, _| {}, bad),
            Err(ConfigError::InvalidProportions { .. })
        ));
        let mut zero_splits = config(1);
        zero_splits.n_splits = 0;
        assert!(
            Backtester::new(x.view(), y.view(), &mut est, |_, _| {}, zero_splits).is_err()
        );
        let mut zero_epochs = config(1);
        zero_epochs.n_epochs = 0;
        assert!(
            Backtester::new(x.view(), y.view(), &mut est, |_, _| {}, zero_epochs).is_err()
        );
    }

    #[test]
    fn test_run_aggregates_fold_outputs() {
        let (x, y) = series(200);
        let mut est = estimator();
        let mut fold_sizes = Vec::new();
        let report = {
            let bt = Backtester::new(
                x.view(),
                y.view(),
                &mut est,
                |truth, preds| {
                    assert_eq!(truth.len(), preds.len());
                    fold_sizes.push(preds.len());
                },
                config(2),
            )
            .unwrap();
            bt.run().unwrap()
        };
        assert_eq!(report.y_true.len(), report.y_pred_proba.len());
        // Two fold callbacks plus one aggregate callback.
        assert_eq!(fold_sizes.len(), 3);
        assert_eq!(fold_sizes[0] + fold_sizes[1], fold_sizes[2]);
        assert_eq!(report.y_pred_proba.len(), fold_sizes[2]);
        assert!(report.y_pred_proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }
}
