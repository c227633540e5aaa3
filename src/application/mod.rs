// Walk-forward backtesting
pub mod backtest;

// Sliding-window dataset and preprocessing
pub mod dataset;

// Streaming feature generators and the feature service
pub mod features;

// Forward-looking target labelers
pub mod labelers;

// Model, optimizer, and estimator wrapper
pub mod ml;
