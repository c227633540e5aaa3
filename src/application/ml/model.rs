use ndarray::{Array1, Array2, Array3, ArrayD, Axis, arr0};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::errors::MlError;

/// Capability set the estimator needs from a trainable sequence classifier:
/// a differentiable forward pass over (batch, seq_len, features) blocks and
/// flat access to its parameters. Any architecture satisfying this is
/// swappable without touching estimator or backtester logic.
pub trait SequenceModel {
    /// Probabilities in `[0, 1]`, one per batch element. Caches the
    /// activations needed by `backward`.
    fn forward(&mut self, batch: &Array3<f64>) -> Array1<f64>;

    /// Parameter gradients for the most recent `forward`, given the loss
    /// gradient with respect to the output probabilities. Same order as
    /// `parameters`.
    fn backward(&mut self, grad_output: &Array1<f64>) -> Vec<ArrayD<f64>>;

    fn parameters(&self) -> Vec<ArrayD<f64>>;

    fn set_parameters(&mut self, params: &[ArrayD<f64>]) -> Result<(), MlError>;
}

struct ForwardCache {
    x_flat: Array2<f64>,
    z1: Array2<f64>,
    a1: Array2<f64>,
    probs: Array1<f64>,
}

/// Binary classifier over flattened windows: one ReLU hidden layer followed
/// by a sigmoid output unit. Initialization is seeded, so training runs are
/// reproducible.
pub struct WindowMlp {
    w1: Array2<f64>,
    b1: Array1<f64>,
    w2: Array1<f64>,
    b2: f64,
    cache: Option<ForwardCache>,
}

impl WindowMlp {
    /// `input_len` is `seq_len * n_features` of the windows this model will
    /// consume.
    pub fn new(input_len: usize, hidden: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let limit1 = (1.0 / input_len as f64).sqrt();
        let limit2 = (1.0 / hidden as f64).sqrt();
        let mut uniform = |limit: f64| -> f64 { (rng.random::<f64>() * 2.0 - 1.0) * limit };
        Self {
            w1: Array2::from_shape_fn((input_len, hidden), |_| uniform(limit1)),
            b1: Array1::zeros(hidden),
            w2: Array1::from_shape_fn(hidden, |_| uniform(limit2)),
            b2: 0.0,
            cache: None,
        }
    }

    fn flatten(batch: &Array3<f64>) -> Array2<f64> {
        let (b, l, f) = batch.dim();
        Array2::from_shape_fn((b, l * f), |(i, j)| batch[[i, j / f, j % f]])
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl SequenceModel for WindowMlp {
    fn forward(&mut self, batch: &Array3<f64>) -> Array1<f64> {
        let x_flat = Self::flatten(batch);
        let z1 = x_flat.dot(&self.w1) + &self.b1;
        let a1 = z1.mapv(|v| v.max(0.0));
        let z2 = a1.dot(&self.w2) + self.b2;
        let probs = z2.mapv(sigmoid);
        self.cache = Some(ForwardCache {
            x_flat,
            z1,
            a1,
            probs: probs.clone(),
        });
        probs
    }

    fn backward(&mut self, grad_output: &Array1<f64>) -> Vec<ArrayD<f64>> {
        let Some(cache) = self.cache.take() else {
            // No forward pass to differentiate.
            return self
                .parameters()
                .iter()
                .map(|p| ArrayD::zeros(p.raw_dim()))
                .collect();
        };
        // d(sigmoid)/dz = p * (1 - p)
        let dz2 = grad_output * &cache.probs.mapv(|p| p * (1.0 - p));
        let grad_w2 = cache.a1.t().dot(&dz2);
        let grad_b2 = dz2.sum();
        let batch = dz2.len();
        let hidden = self.w2.len();
        let mut da1 = Array2::zeros((batch, hidden));
        for i in 0..batch {
            for j in 0..hidden {
                da1[[i, j]] = dz2[i] * self.w2[j];
            }
        }
        let dz1 = da1 * cache.z1.mapv(|z| if z > 0.0 { 1.0 } else { 0.0 });
        let grad_w1 = cache.x_flat.t().dot(&dz1);
        let grad_b1 = dz1.sum_axis(Axis(0));
        vec![
            grad_w1.into_dyn(),
            grad_b1.into_dyn(),
            grad_w2.into_dyn(),
            arr0(grad_b2).into_dyn(),
        ]
    }

    fn parameters(&self) -> Vec<ArrayD<f64>> {
        vec![
            self.w1.clone().into_dyn(),
            self.b1.clone().into_dyn(),
            self.w2.clone().into_dyn(),
            arr0(self.b2).into_dyn(),
        ]
    }

    fn set_parameters(&mut self, params: &[ArrayD<f64>]) -> Result<(), MlError> {
        if params.len() != 4 {
            return Err(MlError::ParameterCount {
                expected: 4,
                got: params.len(),
            });
        }
        self.w1 = params[0]
            .clone()
            .into_dimensionality()
            .map_err(|_| MlError::ParameterShape { index: 0 })?;
        self.b1 = params[1]
            .clone()
            .into_dimensionality()
            .map_err(|_| MlError::ParameterShape { index: 1 })?;
        self.w2 = params[2]
            .clone()
            .into_dimensionality()
            .map_err(|_| MlError::ParameterShape { index: 2 })?;
        self.b2 = *params[3]
            .first()
            .ok_or(MlError::ParameterShape { index: 3 })?;
        Ok(())
    }
}
