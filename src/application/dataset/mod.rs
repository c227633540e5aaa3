mod scaler;
mod sliding_window;

pub use scaler::StandardScaler;
pub use sliding_window::SlidingWindowDataset;
