mod estimator;
mod model;
mod optimizer;
mod scheduler;

pub use estimator::{Estimator, EstimatorConfig};
pub use model::{SequenceModel, WindowMlp};
pub use optimizer::AdamW;
pub use scheduler::StepLr;
