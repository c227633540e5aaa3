use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::domain::errors::MlError;

/// Per-feature standardization to zero mean and unit variance. Fitted on the
/// training slice only; validation and inference data reuse the training
/// statistics. Constant features transform to zero instead of dividing by a
/// zero standard deviation.
#[derive(Debug, Default)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: ArrayView2<'_, f64>) {
        self.mean = Some(x.mean_axis(Axis(0)).unwrap_or_default());
        self.std = Some(x.std_axis(Axis(0), 1.0));
    }

    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(MlError::ScalerNotFitted),
        };
        let mut out = x.to_owned();
        for mut row in out.rows_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = if std[j] > 0.0 {
                    (*value - mean[j]) / std[j]
                } else {
                    0.0
                };
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        self.fit(x);
        self.transform(x)
    }

    pub fn reset(&mut self) {
        self.mean = None;
        self.std = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(x.view()).unwrap();
        // Sample std (ddof = 1): 1.0 and 10.0.
        assert_eq!(out, array![[-1.0, -1.0], [0.0, 0.0], [1.0, 1.0]]);
    }

    #[test]
    fn test_transform_reuses_training_statistics() {
        let train = array![[0.0], [2.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(train.view());
        let out = scaler.transform(array![[4.0]].view()).unwrap();
        // mean 1, std sqrt(2); (4 - 1) / sqrt(2).
        assert!((out[[0, 0]] - 3.0 / 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_constant_feature_maps_to_zero() {
        let x = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(x.view()).unwrap();
        assert_eq!(out, array![[0.0], [0.0], [0.0]]);
    }

    #[test]
    fn test_not_fitted() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(array![[1.0]].view()),
            Err(MlError::ScalerNotFitted)
        ));
    }
}
