use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ndarray::{Array1, Array2, s};
use serde::Deserialize;
use tracing::info;

use tidecast::application::backtest::{BacktestConfig, Backtester};
use tidecast::application::features::indicators::{
    Atr, BollingerPercentile, Ema, Macd, Obv, Rsi, Sma, Vwap,
};
use tidecast::application::features::{DateTimeOneHot, FeatureGenerator, FeatureService};
use tidecast::application::labelers::{BinaryLabeler, BinarySmoothLabeler, Labeler};
use tidecast::application::ml::{Estimator, EstimatorConfig, WindowMlp};
use tidecast::config::Settings;
use tidecast::domain::metrics::evaluate_binary;
use tidecast::domain::types::{Frame, columns};
use tidecast::infrastructure::binance::BinanceMarketData;
use tidecast::infrastructure::persistence::{read_candles, write_candles};

#[derive(Parser)]
#[command(name = "tidecast", about = "Walk-forward crypto price-direction backtesting")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download historical candles from Binance into a CSV file
    Fetch {
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,
        #[arg(long, default_value = "1h")]
        interval: String,
        /// Inclusive start date (UTC)
        #[arg(long)]
        start: NaiveDate,
        /// Exclusive end date (UTC)
        #[arg(long)]
        end: NaiveDate,
        #[arg(long)]
        out: PathBuf,
    },
    /// Run a walk-forward backtest over a candle CSV
    Run {
        /// Candle CSV produced by `fetch`
        #[arg(long)]
        data: PathBuf,
        /// Pipeline TOML configuration
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct PipelineConfig {
    #[serde(default)]
    features: FeaturesConfig,
    label: LabelConfig,
    estimator: EstimatorToml,
    backtest: BacktestToml,
}

#[derive(Debug, Default, Deserialize)]
struct FeaturesConfig {
    #[serde(default)]
    sma: Vec<usize>,
    #[serde(default)]
    ema: Vec<usize>,
    #[serde(default)]
    rsi: Vec<usize>,
    #[serde(default)]
    bollinger_percentile: Vec<BollingerParams>,
    #[serde(default)]
    macd: bool,
    #[serde(default)]
    obv: bool,
    #[serde(default)]
    vwap: bool,
    #[serde(default)]
    atr: Vec<usize>,
    #[serde(default)]
    datetime: bool,
}

#[derive(Debug, Deserialize)]
struct BollingerParams {
    period: usize,
    std_multiplier: f64,
}

#[derive(Debug, Deserialize)]
struct LabelConfig {
    kind: String,
    period: usize,
}

#[derive(Debug, Deserialize)]
struct EstimatorToml {
    batch_size: usize,
    seq_len: usize,
    hidden: usize,
    seed: u64,
    learning_rate: f64,
    weight_decay: f64,
    lr_decay_step: Option<usize>,
    #[serde(default = "default_lr_decay_multiplier")]
    lr_decay_multiplier: f64,
    #[serde(default = "default_standardize")]
    standardize: bool,
}

fn default_lr_decay_multiplier() -> f64 {
    0.1
}

fn default_standardize() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BacktestToml {
    gap_proportion: f64,
    valid_proportion: f64,
    n_splits: usize,
    n_epochs: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Fetch {
            symbol,
            interval,
            start,
            end,
            out,
        } => fetch(&symbol, &interval, start, end, &out).await,
        Command::Run { data, config } => run(&data, &config),
    }
}

async fn fetch(
    symbol: &str,
    interval: &str,
    start: NaiveDate,
    end: NaiveDate,
    out: &PathBuf,
) -> Result<()> {
    let settings = Settings::from_env();
    let market_data = BinanceMarketData::new(settings.binance);
    let start_ms = start
        .and_hms_opt(0, 0, 0)
        .context("invalid start date")?
        .and_utc()
        .timestamp_millis();
    let end_ms = end
        .and_hms_opt(0, 0, 0)
        .context("invalid end date")?
        .and_utc()
        .timestamp_millis();
    let candles = market_data
        .get_historic_prices(symbol, interval, start_ms, end_ms)
        .await?;
    write_candles(out, &candles)?;
    info!(bars = candles.len(), path = %out.display(), "saved candles");
    Ok(())
}

fn run(data: &PathBuf, config_path: &PathBuf) -> Result<()> {
    let raw = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config: PipelineConfig = toml::from_str(&raw)
        .with_context(|| format!("parsing {}", config_path.display()))?;

    let candles = read_candles(data)?;
    if candles.is_empty() {
        bail!("no candles in {}", data.display());
    }
    info!(bars = candles.len(), "loaded candles");
    let frame = Frame::from_candles(&candles);

    let mut service = FeatureService::new(build_generators(&config.features)?);
    service
        .initialize(&frame)
        .context("initializing feature service")?;
    let (keys, x) = service.output_matrix().context("flattening features")?;
    info!(features = keys.len(), "feature table built");

    let labeler = build_labeler(&config.label)?;
    let labels = labeler.transform(&frame).context("computing labels")?;

    let (x, y) = trim_undefined(x, labels, config.label.period)?;
    info!(rows = x.nrows(), "usable rows after warm-up and horizon trim");

    let estimator_config = EstimatorConfig {
        batch_size: config.estimator.batch_size,
        seq_len: config.estimator.seq_len,
        y_position: None,
        learning_rate: config.estimator.learning_rate,
        weight_decay: config.estimator.weight_decay,
        lr_decay_step: config.estimator.lr_decay_step,
        lr_decay_multiplier: config.estimator.lr_decay_multiplier,
        standardize: config.estimator.standardize,
    };
    let model = WindowMlp::new(
        estimator_config.seq_len * x.ncols(),
        config.estimator.hidden,
        config.estimator.seed,
    );
    let mut estimator = Estimator::new(Box::new(model), estimator_config)?;

    let backtest_config = BacktestConfig {
        gap_proportion: config.backtest.gap_proportion,
        valid_proportion: config.backtest.valid_proportion,
        n_splits: config.backtest.n_splits,
        n_epochs: config.backtest.n_epochs,
    };
    let backtester = Backtester::new(
        x.view(),
        y.view(),
        &mut estimator,
        |truth, preds| {
            evaluate_binary(truth, preds);
        },
        backtest_config,
    )?;
    let report = backtester.run()?;
    info!(
        predictions = report.y_pred_proba.len(),
        "backtest complete"
    );
    Ok(())
}

fn build_generators(features: &FeaturesConfig) -> Result<Vec<Box<dyn FeatureGenerator>>> {
    let mut generators: Vec<Box<dyn FeatureGenerator>> = Vec::new();
    for &period in &features.sma {
        generators.push(Box::new(Sma::new(columns::CLOSE, period)?));
    }
    for &period in &features.ema {
        generators.push(Box::new(Ema::new(columns::CLOSE, period)?));
    }
    for &period in &features.rsi {
        generators.push(Box::new(Rsi::new(columns::CLOSE, period)?));
    }
    for params in &features.bollinger_percentile {
        generators.push(Box::new(BollingerPercentile::new(
            columns::CLOSE,
            params.period,
            params.std_multiplier,
        )?));
    }
    if features.macd {
        generators.push(Box::new(Macd::new(columns::CLOSE, 12, 26, 9)?));
    }
    if features.obv {
        generators.push(Box::new(Obv::new(columns::CLOSE, columns::VOLUME)));
    }
    if features.vwap {
        generators.push(Box::new(Vwap::new(
            columns::HIGH,
            columns::LOW,
            columns::CLOSE,
            columns::VOLUME,
        )));
    }
    for &period in &features.atr {
        generators.push(Box::new(Atr::new(
            columns::HIGH,
            columns::LOW,
            columns::CLOSE,
            period,
        )?));
    }
    if features.datetime {
        generators.push(Box::new(DateTimeOneHot::new(columns::OPEN_TIMESTAMP)));
    }
    if generators.is_empty() {
        bail!("feature configuration selects no generators");
    }
    Ok(generators)
}

fn build_labeler(label: &LabelConfig) -> Result<Box<dyn Labeler>> {
    Ok(match label.kind.as_str() {
        "binary" => Box::new(BinaryLabeler::new(columns::CLOSE, label.period)?),
        "binary_smooth" => Box::new(BinarySmoothLabeler::new(columns::CLOSE, label.period)?),
        // Three-class labels would need a multiclass head and metric set;
        // the pipeline trains a binary classifier.
        "three_bar" => bail!("labeler kind `three_bar` is not usable in the binary backtest"),
        other => bail!("unknown labeler kind: {other}"),
    })
}

/// Drops the leading rows where any feature is still in its warm-up window
/// and the trailing rows whose label horizon falls outside the series.
fn trim_undefined(
    x: Array2<f64>,
    labels: Vec<f64>,
    label_period: usize,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let warmup = (0..x.nrows())
        .find(|&i| x.row(i).iter().all(|v| v.is_finite()))
        .context("every row contains an undefined feature")?;
    let end = labels.len() - label_period;
    if warmup >= end {
        bail!(
            "no usable rows: warm-up runs to {} but labels end at {}",
            warmup,
            end
        );
    }
    let x = x.slice(s![warmup..end, ..]).to_owned();
    let y = Array1::from_iter(labels[warmup..end].iter().copied());
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_labeler_accepts_binary_kinds() {
        for kind in ["binary", "binary_smooth"] {
            let config = LabelConfig {
                kind: kind.to_string(),
                period: 3,
            };
            assert!(build_labeler(&config).is_ok());
        }
    }

    #[test]
    fn test_build_labeler_rejects_three_class_kind() {
        let config = LabelConfig {
            kind: "three_bar".to_string(),
            period: 3,
        };
        assert!(build_labeler(&config).is_err());
    }
}
