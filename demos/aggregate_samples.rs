//! # Raw Samples to Candles
//!
//! Streams per-second price samples through the aggregator and trades a simple
//! mean-reversion rule on the resulting 1-minute candles, long and short.
mod utils;

use std::error::Error;

use candle_bt::prelude::*;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let samples = utils::generate_sample_ticks(6 * 3600, 1, 50.0);

    let config = BacktestConfig::builder()
        .candle_interval_sec(60)
        .warmup_sec(30 * 60)
        .trailing_distance_percent(0.004)
        .trailing_step_percent(0.001)
        .build()?;

    let mean_reversion = |candle: &Candle, position: &Position, history: &[Candle]| {
        let window = &history[history.len().saturating_sub(30)..];
        let mean = window.iter().map(|c| c.close()).sum::<f64>() / window.len() as f64;
        let deviation = mean.change(candle.close());
        match position.side() {
            Side::Flat if deviation < -0.01 => Some(Order::Long(10.0)),
            Side::Flat if deviation > 0.01 => Some(Order::Short(10.0)),
            Side::Long if deviation > 0.0 => Some(Order::Close),
            Side::Short if deviation < 0.0 => Some(Order::Close),
            _ => None,
        }
    };

    let report = Backtest::new(config, mean_reversion)?.run_samples(samples)?;

    println!("candles {}", report.curve().len());
    for trade in report.trades().iter().take(10) {
        println!(
            "{:?} {:.4} -> {:.4} ({:?}) pnl {:.4}",
            trade.side(),
            trade.entry_price(),
            trade.exit_price(),
            trade.exit(),
            trade.pnl()
        );
    }
    println!("{}", report.summary());

    Ok(())
}
