//! # Trailing Distance Sweep
//!
//! Runs the same breakout strategy with several trailing distances in parallel
//! and prints the ending equity of each run.
mod utils;

use std::{error::Error, sync::Arc};

use candle_bt::prelude::*;

fn main() -> std::result::Result<(), Box<dyn Error>> {
    env_logger::init();

    let candles: Arc<[Candle]> = utils::example_candles().into();
    let distances = [0.002, 0.005, 0.01, 0.02, 0.05];

    let jobs = distances
        .iter()
        .map(|&distance| -> Result<BatchJob> {
            let config = BacktestConfig::builder()
                .warmup_sec(20 * 300)
                .trailing_distance_percent(distance)
                .trailing_step_percent(0.001)
                .build()?;
            Ok(BatchJob::new(format!("distance {:.1}%", distance * 100.0), config, Arc::clone(&candles)))
        })
        .collect::<Result<Vec<_>>>()?;

    let results = run_batch(&jobs, |_| {
        |candle: &Candle, position: &Position, history: &[Candle]| -> Option<Order> {
            let previous = history.len().checked_sub(2).map(|i| history[i].close())?;
            (position.is_flat() && candle.close() > previous * 1.003).then_some(Order::Long(1.0))
        }
    });

    for (label, result) in results {
        match result {
            Ok(report) => println!(
                "{label}: equity {:.2}, {} trades",
                report.ending_equity(),
                report.trades().len()
            ),
            Err(err) => println!("{label}: {err}"),
        }
    }

    Ok(())
}
