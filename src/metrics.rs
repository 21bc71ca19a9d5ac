//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate:
//! - Max drawdown (absolute and percent)
//! - Profit factor
//! - Sharpe ratio
//! - Win rate
//!
//! The free functions work on plain slices so they can be reused on any equity series;
//! [`Summary`] gathers all of them for a [`BacktestReport`].

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::engine::{BacktestReport, Trade};

/// Largest peak-to-trough decline of `values`, starting from `initial` as the first peak.
///
/// Returns `(absolute, percent)`.
pub fn max_drawdown(initial: f64, values: &[f64]) -> (f64, f64) {
    let mut peak = initial;
    let mut max_abs = 0.0;
    let mut max_pct = 0.0;

    for &value in values {
        if value > peak {
            peak = value;
        }
        let drawdown = peak - value;
        if drawdown > max_abs {
            max_abs = drawdown;
        }
        if peak > 0.0 && drawdown / peak > max_pct {
            max_pct = drawdown / peak;
        }
    }

    (max_abs, max_pct * 100.0)
}

/// Gross gains over gross losses; infinite without losses.
pub fn profit_factor(pnls: &[f64]) -> f64 {
    let mut gains = 0.0;
    let mut losses = 0.0;

    for &pnl in pnls {
        if pnl > 0.0 {
            gains += pnl;
        } else {
            losses += pnl.abs();
        }
    }

    if losses == 0.0 {
        return f64::INFINITY;
    }

    gains / losses
}

/// Mean over sample standard deviation of successive differences of `values`.
///
/// Zero with fewer than two differences or no variation.
pub fn sharpe_ratio(values: &[f64]) -> f64 {
    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.len() < 2 {
        return 0.0;
    }

    let n = diffs.len() as f64;
    let mean = diffs.iter().sum::<f64>() / n;
    let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return 0.0;
    }

    mean / std_dev
}

/// Winning trades as a percentage of all trades.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let wins = pnls.iter().filter(|&&pnl| pnl > 0.0).count();
    wins as f64 / pnls.len() as f64 * 100.0
}

/// Key figures of a finished run.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    starting_equity: f64,
    ending_equity: f64,
    pnl: f64,
    max_drawdown: f64,
    max_drawdown_percent: f64,
    num_trades: usize,
    wins: usize,
    win_rate: f64,
    profit_factor: f64,
    sharpe: f64,
}

impl From<&BacktestReport> for Summary {
    fn from(report: &BacktestReport) -> Self {
        let equity: Vec<f64> = report.curve().iter().map(|p| p.equity()).collect();
        Self::new(report.starting_equity(), report.ending_equity(), &equity, report.trades())
    }
}

impl Summary {
    /// Computes a summary from an equity series and the closed trades.
    pub fn new(starting_equity: f64, ending_equity: f64, equity: &[f64], trades: &[Trade]) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl()).collect();
        let (max_drawdown, max_drawdown_percent) = max_drawdown(starting_equity, equity);

        Self {
            starting_equity,
            ending_equity,
            pnl: ending_equity - starting_equity,
            max_drawdown,
            max_drawdown_percent,
            num_trades: pnls.len(),
            wins: pnls.iter().filter(|&&pnl| pnl > 0.0).count(),
            win_rate: win_rate(&pnls),
            profit_factor: profit_factor(&pnls),
            sharpe: sharpe_ratio(equity),
        }
    }

    /// Equity at run start.
    pub fn starting_equity(&self) -> f64 {
        self.starting_equity
    }

    /// Equity at run end.
    pub fn ending_equity(&self) -> f64 {
        self.ending_equity
    }

    /// Ending minus starting equity.
    pub fn pnl(&self) -> f64 {
        self.pnl
    }

    /// Largest absolute decline of the equity curve.
    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Largest decline relative to the running peak, in percent.
    pub fn max_drawdown_percent(&self) -> f64 {
        self.max_drawdown_percent
    }

    /// Number of closed trades.
    pub fn num_trades(&self) -> usize {
        self.num_trades
    }

    /// Number of trades with a positive P&L.
    pub fn wins(&self) -> usize {
        self.wins
    }

    /// Winning trades in percent, zero without trades.
    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }

    /// Gross gains over gross losses.
    pub fn profit_factor(&self) -> f64 {
        self.profit_factor
    }

    /// Sharpe ratio of per-candle equity changes.
    pub fn sharpe(&self) -> f64 {
        self.sharpe
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Summary ===")?;
        writeln!(f, "Starting Equity: {:.2}", self.starting_equity)?;
        writeln!(f, "Ending Equity: {:.2}", self.ending_equity)?;
        writeln!(f, "Profit & Loss (P&L): {:.2}", self.pnl)?;
        writeln!(f)?;
        writeln!(f, "Trades: {} ({} wins)", self.num_trades, self.wins)?;
        writeln!(f, "Max Drawdown: {:.2} ({:.2}%)", self.max_drawdown, self.max_drawdown_percent)?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor)?;
        writeln!(f, "Sharpe Ratio: {:.2}", self.sharpe)?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate)
    }
}

#[cfg(test)]
#[test]
fn max_drawdown_from_peak() {
    let (abs, pct) = max_drawdown(10_000.0, &[10_000.0, 12_000.0, 9_000.0, 11_000.0]);
    assert_eq!(abs, 3_000.0);
    assert_eq!(pct, 25.0); // (12000 - 9000) / 12000
}

#[cfg(test)]
#[test]
fn max_drawdown_below_initial() {
    let (abs, pct) = max_drawdown(100.0, &[90.0, 95.0]);
    assert_eq!(abs, 10.0);
    assert_eq!(pct, 10.0);
}

#[cfg(test)]
#[test]
fn max_drawdown_no_values() {
    assert_eq!(max_drawdown(10_000.0, &[]), (0.0, 0.0));
}

#[cfg(test)]
#[test]
fn profit_factor_mixed() {
    assert_eq!(profit_factor(&[20.0, -10.0]), 2.0);
}

#[cfg(test)]
#[test]
fn profit_factor_no_losses() {
    assert_eq!(profit_factor(&[20.0]), f64::INFINITY);
    assert_eq!(profit_factor(&[]), f64::INFINITY);
}

#[cfg(test)]
#[test]
fn sharpe_ratio_of_diffs() {
    // diffs 500, -200, 400: mean 233.33, sample stdev 378.59
    let sharpe = sharpe_ratio(&[10_000.0, 10_500.0, 10_300.0, 10_700.0]);
    assert!((sharpe - 0.6163).abs() < 1e-3);
}

#[cfg(test)]
#[test]
fn sharpe_ratio_degenerate() {
    assert_eq!(sharpe_ratio(&[]), 0.0);
    assert_eq!(sharpe_ratio(&[1.0, 2.0]), 0.0);
    assert_eq!(sharpe_ratio(&[1.0, 2.0, 3.0, 4.0]), 0.0);
}

#[cfg(test)]
#[test]
fn win_rate_counts() {
    assert_eq!(win_rate(&[20.0, -10.0]), 50.0);
    assert_eq!(win_rate(&[20.0]), 100.0);
    assert_eq!(win_rate(&[]), 0.0);
}

#[cfg(test)]
#[test]
fn summary_from_report() {
    use crate::config::BacktestConfig;
    use crate::engine::{Backtest, Candle, CandleBuilder, Order, Position};
    use chrono::{DateTime, Duration};

    let candles: Vec<Candle> = [100.0, 104.0, 98.0, 101.0]
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            CandleBuilder::builder()
                .open_time(DateTime::default() + Duration::minutes(5 * i as i64))
                .open(close)
                .high(close)
                .low(close)
                .close(close)
                .build()
                .unwrap()
        })
        .collect();
    let config = BacktestConfig::builder()
        .warmup_sec(0)
        .trailing_distance_percent(0.5)
        .trailing_step_percent(0.5)
        .build()
        .unwrap();
    let strategy = |_: &Candle, _: &Position, history: &[Candle]| (history.len() == 1).then_some(Order::Long(10.0));

    let summary = Backtest::new(config, strategy).unwrap().run(candles).unwrap().summary();
    assert_eq!(summary.starting_equity(), 10_000.0);
    assert_eq!(summary.ending_equity(), 10_010.0);
    assert_eq!(summary.pnl(), 10.0);
    assert_eq!(summary.num_trades(), 1);
    assert_eq!(summary.wins(), 1);
    assert_eq!(summary.win_rate(), 100.0);
    assert_eq!(summary.max_drawdown(), 60.0);
    assert!(summary.to_string().starts_with("=== Backtest Summary ==="));
}
