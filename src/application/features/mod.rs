//! Streaming feature generation.
//!
//! A [`FeatureGenerator`] wraps one technical indicator or derived signal as
//! a stateful streaming unit: it is bulk-initialized over a historical
//! [`Frame`] once, then updated one observation at a time. With
//! `purging=true` an update also evicts the oldest retained observation so
//! that long-running streaming use stays bounded in memory.
//!
//! Outputs are index-aligned with the consumed input stream; positions where
//! the indicator does not have enough history yet ("warm-up") hold NaN.

pub mod datetime;
pub mod indicators;
pub mod service;

pub use datetime::DateTimeOneHot;
pub use indicators::{
    Atr, BollingerBands, BollingerPercentile, Ema, Macd, Obv, Rsi, Sma, Vwap,
};
pub use service::FeatureService;

use crate::domain::errors::FeatureError;
use crate::domain::types::{Frame, Row};

/// Output of a feature generator, aligned with its input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutput {
    /// One value per consumed observation.
    Single(Vec<f64>),
    /// Named sub-signals (e.g. band lower/middle/upper), each one value per
    /// consumed observation. Order is fixed per generator.
    Multi(Vec<(String, Vec<f64>)>),
}

pub trait FeatureGenerator {
    /// Consumes a full historical table. Must be called exactly once, before
    /// any [`FeatureGenerator::add_value`].
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError>;

    /// Appends one observation at the tail. With `purging=true`, evicts the
    /// single oldest retained observation (and its oldest computed output)
    /// after appending, keeping the buffer size constant.
    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError>;

    /// All outputs computed so far, NaN-padded at the front for the warm-up
    /// span. Fails before `initialize`.
    fn output_values(&self) -> Result<FeatureOutput, FeatureError>;

    /// Stable, parameter-encoding identifier used as the flattening key by
    /// the feature service. Must be unique within one service.
    fn name(&self) -> String;
}

/// Prepends `count` NaNs to a computed output sequence.
pub(crate) fn nan_padded<'a, I>(count: usize, computed: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut out = vec![f64::NAN; count];
    out.extend(computed.into_iter().copied());
    out
}
