use ndarray::{Array1, Array2, Array3, ArrayView2, s};

use crate::domain::errors::ConfigError;

/// Read-only view of a flat feature table as fixed-length overlapping
/// windows with stride 1. A table of `n` rows yields `n - seq_len + 1`
/// windows; window `i` covers rows `i..i + seq_len` and its target is
/// `y[i + y_position]` (`y_position` defaults to the last row).
#[derive(Debug)]
pub struct SlidingWindowDataset {
    x: Array2<f64>,
    y: Option<Array1<f64>>,
    seq_len: usize,
    y_position: usize,
}

impl SlidingWindowDataset {
    pub fn new(
        x: Array2<f64>,
        y: Option<Array1<f64>>,
        seq_len: usize,
        y_position: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if seq_len == 0 || seq_len > x.nrows() {
            return Err(ConfigError::InvalidSeqLen {
                seq_len,
                rows: x.nrows(),
            });
        }
        if let Some(y) = &y
            && y.len() != x.nrows()
        {
            return Err(ConfigError::LengthMismatch {
                x_len: x.nrows(),
                y_len: y.len(),
            });
        }
        let y_position = y_position.unwrap_or(seq_len - 1);
        if y_position >= seq_len {
            return Err(ConfigError::InvalidYPosition {
                y_position,
                seq_len,
            });
        }
        Ok(Self {
            x,
            y,
            seq_len,
            y_position,
        })
    }

    pub fn len(&self) -> usize {
        self.x.nrows() - self.seq_len + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    pub fn window(&self, i: usize) -> ArrayView2<'_, f64> {
        self.x.slice(s![i..i + self.seq_len, ..])
    }

    pub fn target(&self, i: usize) -> Option<f64> {
        self.y.as_ref().map(|y| y[i + self.y_position])
    }

    /// The targets aligned with the windows, one per window.
    pub fn targets(&self) -> Option<Array1<f64>> {
        self.y
            .as_ref()
            .map(|y| y.slice(s![self.y_position..self.y_position + self.len()]).to_owned())
    }

    /// Windows `start..end` stacked into one (batch, seq_len, features) block.
    pub fn batch_windows(&self, start: usize, end: usize) -> Array3<f64> {
        let mut batch = Array3::zeros((end - start, self.seq_len, self.x.ncols()));
        for (b, i) in (start..end).enumerate() {
            batch.slice_mut(s![b, .., ..]).assign(&self.window(i));
        }
        batch
    }
}
