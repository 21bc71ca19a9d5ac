//! # Breakout with Trailing Stop
//!
//! Goes long when the close breaks above the highest high of the previous 20 candles
//! and lets the trailing stop manage the exit.
mod utils;

use std::error::Error;

use candle_bt::prelude::*;

const LOOKBACK: usize = 20;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let candles = utils::example_candles();
    let first_price = candles.first().map(|c| c.close()).unwrap_or_default();
    let last_price = candles.last().map(|c| c.close()).unwrap_or_default();

    let config = BacktestConfig::builder()
        .candle_interval_sec(300)
        .warmup_sec(LOOKBACK as u64 * 300)
        .trailing_distance_percent(0.01)
        .trailing_step_percent(0.002)
        .starting_equity(1_000.0)
        .build()?;
    let starting_equity = config.starting_equity();

    let breakout = |candle: &Candle, position: &Position, history: &[Candle]| {
        if !position.is_flat() || history.len() <= LOOKBACK {
            return None;
        }
        let previous = &history[history.len() - 1 - LOOKBACK..history.len() - 1];
        let highest = previous.iter().map(|c| c.high()).fold(f64::MIN, f64::max);
        (candle.close() > highest).then_some(Order::Long(1.0))
    };

    let report = Backtest::new(config, breakout)?.run(candles)?;
    if let Some(err) = report.status().as_error() {
        eprintln!("{err}");
    }

    println!("trades {}", report.trades().len());
    println!("{}", report.summary());

    let perf = starting_equity.change(report.ending_equity()) * 100.0;
    let buy_and_hold_perf = first_price.change(last_price) * 100.0;
    println!("performance {:.2} ({perf:.2}%)", report.ending_equity());
    println!("buy and hold ({buy_and_hold_perf:.2}%)");

    #[cfg(feature = "serde")]
    {
        write_equity_csv("equity.csv", report.curve())?;
        write_summary_json("summary.json", &report.summary())?;
    }

    Ok(())
}
