//! CSV persistence for candle histories.

use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::types::Candle;

pub fn write_candles(path: &Path, candles: &[Candle]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for candle in candles {
        writer
            .serialize(candle)
            .context("serializing candle row")?;
    }
    writer.flush().context("flushing candle csv")?;
    Ok(())
}

pub fn read_candles(path: &Path) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut candles = Vec::new();
    for record in reader.deserialize() {
        candles.push(record.context("parsing candle row")?);
    }
    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candle(open_timestamp: i64) -> Candle {
        Candle {
            open_timestamp,
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close: 105.0,
            volume: 12.5,
            close_timestamp: open_timestamp + 3_599_999,
            quote_asset_volume: 1300.0,
            number_of_trades: 42,
            taker_buy_base_volume: 6.0,
            taker_buy_quote_volume: 630.0,
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let path = std::env::temp_dir().join(format!("tidecast-candles-{}.csv", std::process::id()));
        let candles = vec![sample_candle(0), sample_candle(3_600_000)];
        write_candles(&path, &candles).unwrap();
        let restored = read_candles(&path).unwrap();
        assert_eq!(restored, candles);
        std::fs::remove_file(&path).unwrap();
    }
}
