//! # candle-bt: candle backtesting with trailing stops
//!
//! **candle-bt** replays a price history through a trading strategy and reports how the account
//! would have evolved. Raw price samples are folded into fixed-interval OHLCV candles, a warm-up
//! window is consumed before any decision is allowed, and every open position is protected by a
//! trailing stop that only ever moves in its favor.
//!
//! ## Core Components
//! | Component            | Description                                                                 |
//! |----------------------|-----------------------------------------------------------------------------|
//! | **`CandleAggregator`** | Folds `(timestamp, price, volume)` samples into aligned candles.          |
//! | **`WarmupTracker`**  | Counts candles until the strategy is allowed to trade.                      |
//! | **`TrailingStop`**   | Stop at a fixed distance from the best price, ratcheted in steps.           |
//! | **`EquityTracker`**  | Realized and unrealized P&L accounting, one `EquityPoint` per candle.       |
//! | **`Backtest`**       | Drives the whole run and produces a `BacktestReport`.                       |
//! | **`Summary`**        | Drawdown, profit factor, Sharpe ratio and win rate of a report.             |
//!
//! All percentages are fractions: `0.01` is one percent.
//!
//! ## Features
//! | Feature   | Description                                                                   |
//! |-----------|-------------------------------------------------------------------------------|
//! | `serde`   | Serialize reports, write equity curves (CSV) and summaries (JSON), load candles. |
//! | `batch`   | Run independent backtests in parallel with [`rayon`](https://crates.io/crates/rayon). |
//!
//! ## Getting Started
//! ```rust
//! use candle_bt::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let candles = [(100.0, 101.0, 99.5, 100.5), (100.5, 103.0, 100.2, 102.5), (102.5, 102.6, 99.0, 99.5)]
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &(open, high, low, close))| {
//!         CandleBuilder::builder()
//!             .open_time(DateTime::default() + Duration::minutes(5 * i as i64))
//!             .open(open)
//!             .high(high)
//!             .low(low)
//!             .close(close)
//!             .build()
//!     })
//!     .collect::<Result<Vec<_>>>()
//!     .unwrap();
//!
//! let config = BacktestConfig::builder()
//!     .warmup_sec(0)
//!     .trailing_distance_percent(0.01)
//!     .trailing_step_percent(0.002)
//!     .build()
//!     .unwrap();
//!
//! // buy once, let the trailing stop do the rest
//! let strategy = |_: &Candle, position: &Position, history: &[Candle]| {
//!     (position.is_flat() && history.len() == 1).then_some(Order::Long(1.0))
//! };
//!
//! let report = Backtest::new(config, strategy).unwrap().run(candles).unwrap();
//! assert_eq!(report.trades().len(), 1);
//! println!("{}", report.summary());
//! ```
//!
//! ### Output:
//! ```bash
//! === Backtest Summary ===
//! Starting Equity: 10000.00
//! Ending Equity: 10001.47
//! Profit & Loss (P&L): 1.47
//! ...
//! ```
//!
//! ## Error Handling
//! Every fallible operation returns [`errors::Result`]. Malformed samples or candles, invalid
//! configuration and invalid orders abort the run; a history too short for the warm-up does not,
//! it completes with [`engine::RunStatus::InsufficientData`].
#![warn(missing_docs)]

/// Run configuration and validation.
pub mod config;

/// Candles, aggregation, trailing stops, accounting and the backtest loop.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Performance summary: drawdown, profit factor, Sharpe ratio, win rate.
pub mod metrics;

/// Equity curve and summary files, candle loading.
#[cfg(feature = "serde")]
pub mod export;

/// Parallel execution of independent backtests.
#[cfg(feature = "batch")]
pub mod batch;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::metrics::*;

    #[cfg(feature = "serde")]
    pub use crate::export::*;

    #[cfg(feature = "batch")]
    pub use crate::batch::*;
}

use std::ops::{Add, Div, Mul, Sub};

/// Fraction-based price arithmetic.
///
/// Fractions are plain ratios: `0.01` is one percent.
pub trait FractionCalculus<Rhs = Self> {
    /// Increases the value by `fraction` of itself.
    fn add_fraction(self, fraction: Rhs) -> Self;

    /// Decreases the value by `fraction` of itself.
    fn sub_fraction(self, fraction: Rhs) -> Self;

    /// Relative change from the value to `new`, as a fraction.
    fn change(self, new: Self) -> Self;
}

impl FractionCalculus for f64 {
    fn add_fraction(self, fraction: Self) -> Self {
        self.mul(fraction.add(1.0))
    }

    fn sub_fraction(self, fraction: Self) -> Self {
        self.mul(1.0 - fraction)
    }

    fn change(self, new: Self) -> Self {
        new.sub(self).div(self)
    }
}
