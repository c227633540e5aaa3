mod binary;
mod binary_smooth;
mod three_bar;

pub use binary::BinaryLabeler;
pub use binary_smooth::BinarySmoothLabeler;
pub use three_bar::ThreeBarLabeler;

use crate::domain::errors::FeatureError;
use crate::domain::types::Frame;

/// Forward-looking target labels over a full price series. Stateless apart
/// from configuration: `transform` is a pure function producing one label per
/// input row, with the trailing `period` rows undefined because their future
/// horizon falls outside the series.
pub trait Labeler {
    fn transform(&self, data: &Frame) -> Result<Vec<f64>, FeatureError>;
}
