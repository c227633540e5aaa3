use std::collections::HashSet;

use ndarray::Array2;

use crate::application::features::{FeatureGenerator, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::types::{Frame, Row};

const KEY_DELIMITER: &str = "__";

/// A fixed, ordered collection of feature generators sharing one lifecycle.
///
/// `initialize` and `add_value` fan out to every generator in declaration
/// order; `output_values` flattens all outputs into one name-keyed table.
/// Two generators producing the same flattened key is a configuration bug
/// and is rejected rather than silently overwritten, so `initialize`
/// verifies key uniqueness up front.
pub struct FeatureService {
    generators: Vec<Box<dyn FeatureGenerator>>,
}

impl FeatureService {
    pub fn new(generators: Vec<Box<dyn FeatureGenerator>>) -> Self {
        Self { generators }
    }

    pub fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        for generator in &mut self.generators {
            generator.initialize(data)?;
        }
        // Surfaces key collisions now instead of at first read.
        self.output_values().map(|_| ())
    }

    pub fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        for generator in &mut self.generators {
            generator.add_value(row, purging)?;
        }
        Ok(())
    }

    /// Flattened outputs of all generators, in declaration order. Sub-signal
    /// keys are prefixed with the generator name.
    pub fn output_values(&self) -> Result<Vec<(String, Vec<f64>)>, FeatureError> {
        let mut flattened = Vec::new();
        let mut seen = HashSet::new();
        for generator in &self.generators {
            let name = generator.name();
            match generator.output_values()? {
                FeatureOutput::Single(values) => {
                    if !seen.insert(name.clone()) {
                        return Err(FeatureError::KeyCollision(name));
                    }
                    flattened.push((name, values));
                }
                FeatureOutput::Multi(outputs) => {
                    for (sub, values) in outputs {
                        let key = format!("{name}{KEY_DELIMITER}{sub}");
                        if !seen.insert(key.clone()) {
                            return Err(FeatureError::KeyCollision(key));
                        }
                        flattened.push((key, values));
                    }
                }
            }
        }
        Ok(flattened)
    }

    /// Flattened outputs as a (rows x features) matrix plus the column keys.
    pub fn output_matrix(&self) -> Result<(Vec<String>, Array2<f64>), FeatureError> {
        let flattened = self.output_values()?;
        let rows = flattened.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut matrix = Array2::zeros((rows, flattened.len()));
        let mut keys = Vec::with_capacity(flattened.len());
        for (j, (key, values)) in flattened.into_iter().enumerate() {
            for (i, value) in values.into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
            keys.push(key);
        }
        Ok((keys, matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::features::indicators::{BollingerBands, Sma};

    fn sample_data() -> Frame {
        Frame::new().with_column("price", vec![1.0, 2.0, 3.0, 4.0, 5.0])
    }

    #[test]
    fn test_flattened_keys() {
        let mut service = FeatureService::new(vec![
            Box::new(Sma::new("price", 3).unwrap()),
            Box::new(BollingerBands::new("price", 3, 2.0).unwrap()),
        ]);
        service.initialize(&sample_data()).unwrap();
        let keys: Vec<String> = service
            .output_values()
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            keys,
            vec![
                "SMA__price__3",
                "BB__price__lower",
                "BB__price__middle",
                "BB__price__upper",
            ]
        );
    }

    #[test]
    fn test_fan_out_add_value() {
        let mut service = FeatureService::new(vec![
            Box::new(Sma::new("price", 2).unwrap()),
            Box::new(Sma::new("price", 3).unwrap()),
        ]);
        service.initialize(&sample_data()).unwrap();
        service
            .add_value(&Row::new().with("price", 6.0), false)
            .unwrap();
        for (_, values) in service.output_values().unwrap() {
            assert_eq!(values.len(), 6);
        }
    }

    #[test]
    fn test_key_collision_rejected_at_initialize() {
        let mut service = FeatureService::new(vec![
            Box::new(Sma::new("price", 3).unwrap()),
            Box::new(Sma::new("price", 3).unwrap()),
        ]);
        let err = service.initialize(&sample_data()).unwrap_err();
        assert!(matches!(err, FeatureError::KeyCollision(key) if key == "SMA__price__3"));
    }

    #[test]
    fn test_output_matrix_shape() {
        let mut service = FeatureService::new(vec![
            Box::new(Sma::new("price", 2).unwrap()),
            Box::new(BollingerBands::new("price", 2, 2.0).unwrap()),
        ]);
        service.initialize(&sample_data()).unwrap();
        let (keys, matrix) = service.output_matrix().unwrap();
        assert_eq!(keys.len(), 4);
        assert_eq!(matrix.dim(), (5, 4));
        assert!(matrix[[0, 0]].is_nan());
        assert_eq!(matrix[[1, 0]], 1.5);
    }
}
