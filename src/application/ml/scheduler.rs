/// Step-decay learning-rate schedule: the rate is multiplied by `gamma`
/// every `step_size` epochs. A `None` step size means a constant rate.
#[derive(Debug)]
pub struct StepLr {
    base_lr: f64,
    step_size: Option<usize>,
    gamma: f64,
    epoch: usize,
}

impl StepLr {
    pub fn new(base_lr: f64, step_size: Option<usize>, gamma: f64) -> Self {
        Self {
            base_lr,
            step_size,
            gamma,
            epoch: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        match self.step_size {
            Some(step) => self.base_lr * self.gamma.powi((self.epoch / step) as i32),
            None => self.base_lr,
        }
    }

    /// Advances one epoch.
    pub fn step(&mut self) {
        self.epoch += 1;
    }

    pub fn reset(&mut self) {
        self.epoch = 0;
    }
}
