use std::collections::VecDeque;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::application::features::{FeatureGenerator, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::types::{Frame, Row};

const TIMES_OF_DAY: [&str; 4] = ["morning", "afternoon", "evening", "night"];

/// Calendar one-hot features derived from a millisecond timestamp column:
/// day of week (Monday = 0), month, quarter, and a coarse time-of-day bucket.
///
/// Category sets are fixed, so the output keys do not depend on the data.
#[derive(Debug)]
pub struct DateTimeOneHot {
    timestamp_col: String,
    timestamps: VecDeque<i64>,
    initialized: bool,
}

impl DateTimeOneHot {
    pub fn new(timestamp_col: &str) -> Self {
        Self {
            timestamp_col: timestamp_col.to_string(),
            timestamps: VecDeque::new(),
            initialized: false,
        }
    }

    fn time_of_day(hour: u32) -> &'static str {
        match hour {
            5..=11 => "morning",
            12..=16 => "afternoon",
            17..=20 => "evening",
            _ => "night",
        }
    }

    fn one_hot<T: PartialEq>(values: &[T], categories: impl Iterator<Item = T>) -> Vec<Vec<f64>> {
        categories
            .map(|cat| {
                values
                    .iter()
                    .map(|v| if *v == cat { 1.0 } else { 0.0 })
                    .collect()
            })
            .collect()
    }
}

impl FeatureGenerator for DateTimeOneHot {
    fn initialize(&mut self, data: &Frame) -> Result<(), FeatureError> {
        if self.initialized {
            return Err(FeatureError::AlreadyInitialized(self.name()));
        }
        for &ts in data.column(&self.timestamp_col)? {
            self.timestamps.push_back(ts as i64);
        }
        self.initialized = true;
        Ok(())
    }

    fn add_value(&mut self, row: &Row, purging: bool) -> Result<(), FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        self.timestamps
            .push_back(row.get(&self.timestamp_col)? as i64);
        if purging {
            self.timestamps.pop_front();
        }
        Ok(())
    }

    fn output_values(&self) -> Result<FeatureOutput, FeatureError> {
        if !self.initialized {
            return Err(FeatureError::NotInitialized(self.name()));
        }
        let datetimes: Vec<DateTime<Utc>> = self
            .timestamps
            .iter()
            .map(|&ts| DateTime::from_timestamp_millis(ts).unwrap_or_default())
            .collect();

        let days: Vec<u32> = datetimes
            .iter()
            .map(|dt| dt.weekday().num_days_from_monday())
            .collect();
        let months: Vec<u32> = datetimes.iter().map(|dt| dt.month()).collect();
        let quarters: Vec<u32> = datetimes.iter().map(|dt| (dt.month() - 1) / 3 + 1).collect();
        let times: Vec<&str> = datetimes
            .iter()
            .map(|dt| Self::time_of_day(dt.hour()))
            .collect();

        let mut outputs = Vec::new();
        for (i, col) in Self::one_hot(&days, 0..7).into_iter().enumerate() {
            outputs.push((format!("day_of_week_{i}"), col));
        }
        for (i, col) in Self::one_hot(&months, 1..13).into_iter().enumerate() {
            outputs.push((format!("month_{}", i + 1), col));
        }
        for (i, col) in Self::one_hot(&quarters, 1..5).into_iter().enumerate() {
            outputs.push((format!("quarter_{}", i + 1), col));
        }
        for (name, col) in TIMES_OF_DAY
            .iter()
            .zip(Self::one_hot(&times, TIMES_OF_DAY.into_iter()))
        {
            outputs.push((format!("time_of_day_{name}"), col));
        }
        Ok(FeatureOutput::Multi(outputs))
    }

    fn name(&self) -> String {
        "DateTime".to_string()
    }
}
