use ndarray::ArrayD;

const BETA_1: f64 = 0.9;
const BETA_2: f64 = 0.999;
const EPSILON: f64 = 1e-8;

/// Adam with decoupled weight decay. Moment buffers are allocated lazily on
/// the first step so the optimizer can be constructed before the parameter
/// shapes are known.
#[derive(Debug)]
pub struct AdamW {
    weight_decay: f64,
    step_count: usize,
    m: Vec<ArrayD<f64>>,
    v: Vec<ArrayD<f64>>,
}

impl AdamW {
    pub fn new(weight_decay: f64) -> Self {
        Self {
            weight_decay,
            step_count: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    pub fn step(&mut self, params: &mut [ArrayD<f64>], grads: &[ArrayD<f64>], lr: f64) {
        if self.m.is_empty() {
            self.m = params.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
            self.v = params.iter().map(|p| ArrayD::zeros(p.raw_dim())).collect();
        }
        self.step_count += 1;
        let t = self.step_count as i32;
        let bias_1 = 1.0 - BETA_1.powi(t);
        let bias_2 = 1.0 - BETA_2.powi(t);
        let weight_decay = self.weight_decay;

        for ((param, grad), (m, v)) in params
            .iter_mut()
            .zip(grads)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            // Decay is applied to the parameter directly, not folded into the
            // gradient.
            param.mapv_inplace(|p| p * (1.0 - lr * weight_decay));
            m.zip_mut_with(grad, |m, &g| *m = BETA_1 * *m + (1.0 - BETA_1) * g);
            v.zip_mut_with(grad, |v, &g| *v = BETA_2 * *v + (1.0 - BETA_2) * g * g);
            for ((p, &m), &v) in param.iter_mut().zip(m.iter()).zip(v.iter()) {
                let m_hat = m / bias_1;
                let v_hat = v / bias_2;
                *p -= lr * m_hat / (v_hat.sqrt() + EPSILON);
            }
        }
    }

    /// Drops all accumulated momentum and the step counter.
    pub fn reset(&mut self) {
        self.step_count = 0;
        self.m.clear();
        self.v.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn test_first_step_moves_against_gradient() {
        let mut opt = AdamW::new(0.0);
        let mut params = vec![arr1(&[1.0, -1.0]).into_dyn()];
        let grads = vec![arr1(&[0.5, -0.5]).into_dyn()];
        opt.step(&mut params, &grads, 0.1);
        // With bias correction the first step is ~lr in the gradient's
        // opposite direction.
        assert!(params[0][[0]] < 1.0);
        assert!(params[0][[1]] > -1.0);
        assert!((params[0][[0]] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_weight_decay_shrinks_parameters() {
        let mut opt = AdamW::new(0.5);
        let mut params = vec![arr1(&[2.0]).into_dyn()];
        let grads = vec![arr1(&[0.0]).into_dyn()];
        opt.step(&mut params, &grads, 0.1);
        // Zero gradient, so only the decay term acts: 2.0 * (1 - 0.1 * 0.5).
        assert!((params[0][[0]] - 1.9).abs() < 1e-12);
    }

    #[test]
    fn test_reset_restores_first_step_behavior() {
        let mut opt = AdamW::new(0.0);
        let grads = vec![arr1(&[1.0]).into_dyn()];

        let mut first = vec![arr1(&[0.0]).into_dyn()];
        opt.step(&mut first, &grads, 0.1);

        opt.step(&mut vec![arr1(&[0.0]).into_dyn()], &grads, 0.1);
        opt.reset();

        let mut after_reset = vec![arr1(&[0.0]).into_dyn()];
        opt.step(&mut after_reset, &grads, 0.1);
        assert_eq!(first[0], after_reset[0]);
    }
}
