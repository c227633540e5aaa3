// Binance REST market data client
pub mod binance;

// MediaStack news client
pub mod news;

// Environment-scoped blob storage
pub mod object_store;

// CSV candle persistence
pub mod persistence;
