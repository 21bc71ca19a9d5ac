use candle_bt::engine::{Candle, CandleBuilder, Sample};
use chrono::{DateTime, Duration};

/// Generates deterministic 5-minute candle data.
#[allow(dead_code)]
pub fn generate_sample_candles(max: i32, seed: i32, base_price: f64) -> Vec<Candle> {
    let mut open_time = DateTime::default();
    let mut open = base_price;

    (0..=max)
        .map(|i| {
            // Base price with trend (+ 0.02*i)
            let base_price = base_price + 0.02 * (i as f64);

            // Price variation using simple trigonometric function with seed
            let variation = 5.0 * ((i as f64 * 0.05 + seed as f64).sin() * 0.5 + 0.5);

            let close = base_price + variation;
            let wick = 0.1 + 0.05 * (i as f64 * 0.7).cos().abs();
            let high = open.max(close) + wick;
            let low = open.min(close) - wick;
            // Volume with seasonal pattern
            let volume = 1000.0 + 500.0 * ((i as f64 * 0.2).sin()).abs();

            let candle = CandleBuilder::builder()
                .open_time(open_time)
                .open(open)
                .high(high)
                .low(low)
                .close(close)
                .volume(volume)
                .build()
                .unwrap();

            open_time += Duration::minutes(5);
            open = close;
            candle
        })
        .collect()
}

#[allow(dead_code)]
pub fn example_candles() -> Vec<Candle> {
    generate_sample_candles(3000, 42, 100.0)
}

/// Generates one price sample every `step_sec` seconds, starting at epoch 0.
#[allow(dead_code)]
pub fn generate_sample_ticks(count: i64, step_sec: i64, base_price: f64) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            let price = base_price + 0.001 * t + 3.0 * (t * 0.01).sin() + 0.2 * (t * 0.37).cos();
            let volume = 0.5 + (t * 0.13).sin().abs();
            Sample::from((i * step_sec, price, volume))
        })
        .collect()
}

#[allow(dead_code)]
fn main() {}
