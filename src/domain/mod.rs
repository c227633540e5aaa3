// Domain-specific error types
pub mod errors;

// Binary classification metrics
pub mod metrics;

// Core market data and tabular types
pub mod types;
