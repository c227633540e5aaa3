use anyhow::{Context, Result};
use ndarray::{Array1, ArrayD, ArrayView1, ArrayView2, s};
use tracing::{debug, info};

use crate::application::dataset::{SlidingWindowDataset, StandardScaler};
use crate::application::ml::{AdamW, SequenceModel, StepLr};
use crate::domain::errors::ConfigError;

const PROB_CLAMP: f64 = 1e-7;

#[derive(Debug, Clone)]
pub struct EstimatorConfig {
    pub batch_size: usize,
    pub seq_len: usize,
    /// Offset of the target row within each window; defaults to the last row.
    pub y_position: Option<usize>,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub lr_decay_step: Option<usize>,
    pub lr_decay_multiplier: f64,
    pub standardize: bool,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            seq_len: 16,
            y_position: None,
            learning_rate: 1e-3,
            weight_decay: 1e-2,
            lr_decay_step: None,
            lr_decay_multiplier: 0.1,
            standardize: true,
        }
    }
}

/// Trains a [`SequenceModel`] over sliding windows with AdamW and a step
/// learning-rate schedule. Batches are consumed in series order, never
/// shuffled. `reset_model` restores the construction-time parameter snapshot
/// along with fresh optimizer, scheduler, and scaler state, so repeated
/// fit cycles start from identical conditions.
pub struct Estimator {
    model: Box<dyn SequenceModel>,
    initial_params: Vec<ArrayD<f64>>,
    optimizer: AdamW,
    scheduler: StepLr,
    scaler: StandardScaler,
    config: EstimatorConfig,
}

impl Estimator {
    pub fn new(
        model: Box<dyn SequenceModel>,
        config: EstimatorConfig,
    ) -> Result<Self, ConfigError> {
        if config.batch_size == 0 {
            return Err(ConfigError::NonPositive {
                name: "batch_size",
                value: 0.0,
            });
        }
        if config.seq_len == 0 {
            return Err(ConfigError::NonPositive {
                name: "seq_len",
                value: 0.0,
            });
        }
        // Some(0) would divide by zero in the schedule; None means constant.
        if config.lr_decay_step == Some(0) {
            return Err(ConfigError::NonPositive {
                name: "lr_decay_step",
                value: 0.0,
            });
        }
        let initial_params = model.parameters();
        let optimizer = AdamW::new(config.weight_decay);
        let scheduler = StepLr::new(
            config.learning_rate,
            config.lr_decay_step,
            config.lr_decay_multiplier,
        );
        Ok(Self {
            model,
            initial_params,
            optimizer,
            scheduler,
            scaler: StandardScaler::new(),
            config,
        })
    }

    pub fn fit(
        &mut self,
        x_train: ArrayView2<'_, f64>,
        y_train: ArrayView1<'_, f64>,
        valid: Option<(ArrayView2<'_, f64>, ArrayView1<'_, f64>)>,
        n_epochs: usize,
    ) -> Result<()> {
        let x = if self.config.standardize {
            self.scaler
                .fit_transform(x_train)
                .context("standardizing training features")?
        } else {
            x_train.to_owned()
        };
        let dataset = SlidingWindowDataset::new(
            x,
            Some(y_train.to_owned()),
            self.config.seq_len,
            self.config.y_position,
        )
        .context("building training windows")?;
        let targets = dataset
            .targets()
            .context("training targets are required for fit")?;

        for epoch in 0..n_epochs {
            let lr = self.scheduler.lr();
            let mut epoch_loss = 0.0;
            let mut n_batches = 0;
            let mut start = 0;
            while start < dataset.len() {
                let end = (start + self.config.batch_size).min(dataset.len());
                let batch = dataset.batch_windows(start, end);
                let batch_targets = targets.slice(s![start..end]);

                let probs = self.model.forward(&batch);
                epoch_loss += bce_loss(probs.view(), batch_targets);
                let grad = bce_grad(probs.view(), batch_targets);
                let grads = self.model.backward(&grad);
                let mut params = self.model.parameters();
                self.optimizer.step(&mut params, &grads, lr);
                self.model
                    .set_parameters(&params)
                    .context("applying optimizer update")?;

                n_batches += 1;
                start = end;
            }
            let train_loss = epoch_loss / n_batches.max(1) as f64;

            if let Some((x_valid, y_valid)) = &valid {
                let valid_loss = self.evaluate(x_valid.view(), y_valid.view())?;
                info!(epoch, lr, train_loss, valid_loss, "epoch complete");
            } else {
                debug!(epoch, lr, train_loss, "epoch complete");
            }
            self.scheduler.step();
        }
        Ok(())
    }

    /// Probabilities for every complete window of `x`, in input order. The
    /// output has `x.nrows() - seq_len + 1` entries.
    pub fn predict(&mut self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let x = if self.config.standardize {
            self.scaler
                .transform(x)
                .context("standardizing inference features")?
        } else {
            x.to_owned()
        };
        let dataset = SlidingWindowDataset::new(x, None, self.config.seq_len, self.config.y_position)
            .context("building inference windows")?;
        let mut predictions = Vec::with_capacity(dataset.len());
        let mut start = 0;
        while start < dataset.len() {
            let end = (start + self.config.batch_size).min(dataset.len());
            let batch = dataset.batch_windows(start, end);
            predictions.extend(self.model.forward(&batch));
            start = end;
        }
        Ok(Array1::from_vec(predictions))
    }

    /// Mean binary cross-entropy of `predict(x)` against `y`, realigned to
    /// the windowed output with the same offset used in training.
    pub fn evaluate(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<f64> {
        let predictions = self.predict(x)?;
        let truth = self.align_targets(y, predictions.len());
        Ok(bce_loss(predictions.view(), truth))
    }

    /// Drops the leading targets that have no corresponding prediction window.
    pub fn align_targets<'a>(
        &self,
        y: ArrayView1<'a, f64>,
        n_windows: usize,
    ) -> ArrayView1<'a, f64> {
        let offset = self.config.y_position.unwrap_or(self.config.seq_len - 1);
        y.slice_move(s![offset..offset + n_windows])
    }

    /// Restores model parameters, optimizer, scheduler, and scaler to their
    /// construction-time state.
    pub fn reset_model(&mut self) -> Result<()> {
        self.model
            .set_parameters(&self.initial_params)
            .context("restoring initial model parameters")?;
        self.optimizer.reset();
        self.scheduler.reset();
        self.scaler.reset();
        Ok(())
    }

    pub fn parameters(&self) -> Vec<ArrayD<f64>> {
        self.model.parameters()
    }

    pub fn seq_len(&self) -> usize {
        self.config.seq_len
    }
}

fn clamp_prob(p: f64) -> f64 {
    p.clamp(PROB_CLAMP, 1.0 - PROB_CLAMP)
}

fn bce_loss(probs: ArrayView1<'_, f64>, targets: ArrayView1<'_, f64>) -> f64 {
    let n = probs.len().max(1) as f64;
    probs
        .iter()
        .zip(targets.iter())
        .map(|(&p, &y)| {
            let p = clamp_prob(p);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum::<f64>()
        / n
}

fn bce_grad(probs: ArrayView1<'_, f64>, targets: ArrayView1<'_, f64>) -> Array1<f64> {
    let n = probs.len().max(1) as f64;
    let mut grad = Array1::zeros(probs.len());
    for (g, (&p, &y)) in grad.iter_mut().zip(probs.iter().zip(targets.iter())) {
        let p = clamp_prob(p);
        *g = (-(y / p) + (1.0 - y) / (1.0 - p)) / n;
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::WindowMlp;
    use ndarray::{Array1, Array2};

    fn toy_config() -> EstimatorConfig {
        EstimatorConfig {
            batch_size: 8,
            seq_len: 3,
            y_position: None,
            learning_rate: 0.01,
            weight_decay: 0.001,
            lr_decay_step: Some(2),
            lr_decay_multiplier: 0.5,
            standardize: true,
        }
    }

    fn toy_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 2), |(i, j)| ((i + j) as f64).sin());
        let y = Array1::from_shape_fn(n, |i| if i % 2 == 0 { 1.0 } else { 0.0 });
        (x, y)
    }

    fn toy_estimator() -> Estimator {
        let config = toy_config();
        let model = WindowMlp::new(config.seq_len * 2, 8, 11);
        Estimator::new(Box::new(model), config).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        for config in [
            EstimatorConfig {
                batch_size: 0,
                ..toy_config()
            },
            EstimatorConfig {
                seq_len: 0,
                ..toy_config()
            },
            EstimatorConfig {
                lr_decay_step: Some(0),
                ..toy_config()
            },
        ] {
            let model = WindowMlp::new(6, 8, 11);
            assert!(matches!(
                Estimator::new(Box::new(model), config),
                Err(ConfigError::NonPositive { .. })
            ));
        }
    }

    #[test]
    fn test_predict_length() {
        let (x, y) = toy_data(30);
        let mut est = toy_estimator();
        est.fit(x.view(), y.view(), None, 1).unwrap();
        let preds = est.predict(x.view()).unwrap();
        assert_eq!(preds.len(), 30 - 3 + 1);
        assert!(preds.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_fit_reduces_training_loss() {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, _)| if i % 2 == 0 { 1.0 } else { -1.0 });
        let y = Array1::from_shape_fn(n, |i| if i % 2 == 0 { 1.0 } else { 0.0 });
        let mut est = toy_estimator();
        let before = est.evaluate(x.view(), y.view());
        // Scaler is unfitted before the first fit call.
        assert!(before.is_err());
        est.fit(x.view(), y.view(), None, 1).unwrap();
        let after_one = est.evaluate(x.view(), y.view()).unwrap();
        est.fit(x.view(), y.view(), None, 20).unwrap();
        let after_many = est.evaluate(x.view(), y.view()).unwrap();
        assert!(after_many < after_one);
    }

    #[test]
    fn test_reset_isolation() {
        let (x, y) = toy_data(40);

        let mut fresh = toy_estimator();
        fresh.fit(x.view(), y.view(), None, 3).unwrap();
        let fresh_params = fresh.parameters();

        let mut reused = toy_estimator();
        reused.fit(x.view(), y.view(), None, 5).unwrap();
        reused.reset_model().unwrap();
        reused.fit(x.view(), y.view(), None, 3).unwrap();

        assert_eq!(fresh_params, reused.parameters());
    }

    #[test]
    fn test_align_targets() {
        let est = toy_estimator();
        let y = Array1::from_shape_fn(10, |i| i as f64);
        let aligned = est.align_targets(y.view(), 8);
        assert_eq!(aligned.to_vec(), vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_bce_loss_known_value() {
        let probs = Array1::from_vec(vec![0.5, 0.5]);
        let targets = Array1::from_vec(vec![1.0, 0.0]);
        let loss = bce_loss(probs.view(), targets.view());
        assert!((loss - 0.5_f64.ln().abs()).abs() < 1e-12);
    }
}
