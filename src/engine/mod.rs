//! Core backtest engine.
//!
//! This module provides the building blocks of a run:
//! - `Candle` / `CandleAggregator`: OHLCV buckets folded from raw samples.
//! - `WarmupTracker`: gates trading until enough history was consumed.
//! - `TrailingStop`: per-position stop that only moves in the position's favor.
//! - `EquityTracker`: realized / unrealized P&L accounting.
//! - `Backtest`: replays candles through a `Strategy` and emits the equity curve.

mod aggregator;
mod candle;
mod equity;
mod order;
mod position;
mod trailing;
mod warmup;

use log::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::config::{BacktestConfig, FillPrice};
use crate::errors::{Error, Result};
use crate::metrics::Summary;

pub use aggregator::*;
pub use candle::*;
pub use equity::*;
pub use order::*;
pub use position::*;
pub use trailing::*;
pub use warmup::*;

/// Lifecycle of a run.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, no candle consumed yet.
    Init,
    /// Consuming candles without trading.
    Warmup,
    /// Trading enabled.
    Active,
    /// Input exhausted, every position closed.
    Done,
}

/// How a completed run ended.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// At least one candle was processed with trading enabled.
    Completed,
    /// The data never got past the warm-up; no trade was possible.
    InsufficientData {
        /// Candles the warm-up needs.
        required: usize,
        /// Candles the run consumed.
        available: usize,
    },
}

impl RunStatus {
    /// The matching [`Error::InsufficientData`], for callers that report it as such.
    pub fn as_error(&self) -> Option<Error> {
        match *self {
            Self::Completed => None,
            Self::InsufficientData { required, available } => Some(Error::InsufficientData { required, available }),
        }
    }
}

/// Output of a finished run.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone)]
pub struct BacktestReport {
    config: BacktestConfig,
    state: RunState,
    status: RunStatus,
    ending_equity: f64,
    realized_pnl: f64,
    curve: Vec<EquityPoint>,
    trades: Vec<Trade>,
}

impl BacktestReport {
    /// Configuration the run used.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Lifecycle state the run ended in.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// How the run ended.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Equity at run start.
    pub fn starting_equity(&self) -> f64 {
        self.config.starting_equity()
    }

    /// Equity after the final force close.
    pub fn ending_equity(&self) -> f64 {
        self.ending_equity
    }

    /// Sum of every closed trade's P&L.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// One point per consumed candle, in order.
    pub fn curve(&self) -> &[EquityPoint] {
        &self.curve
    }

    /// Closed trades, in order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Performance figures of the run.
    pub fn summary(&self) -> Summary {
        Summary::from(self)
    }
}

/// Replays candles through a strategy.
///
/// Each candle is handled in a fixed order: pending fill, trailing stop, strategy,
/// mark-to-market. A stop that fires skips the strategy for that candle.
#[derive(Debug)]
pub struct Backtest<S> {
    config: BacktestConfig,
    strategy: S,
    state: RunState,
    warmup: WarmupTracker,
    equity: EquityTracker,
    position: Position,
    stop: Option<TrailingStop>,
    pending: Option<Order>,
    history: Vec<Candle>,
    curve: Vec<EquityPoint>,
    trades: Vec<Trade>,
}

impl<S> std::ops::Deref for Backtest<S> {
    type Target = EquityTracker;

    fn deref(&self) -> &Self::Target {
        &self.equity
    }
}

impl<S: Strategy> Backtest<S> {
    /// Creates a run; fails with [`Error::InvalidConfig`] before touching any candle.
    ///
    /// ### Example
    /// ```rust
    /// use candle_bt::prelude::*;
    /// use chrono::DateTime;
    ///
    /// let config = BacktestConfig::builder().warmup_sec(0).build().unwrap();
    /// let candle = CandleBuilder::builder()
    ///     .open_time(DateTime::default())
    ///     .open(100.0)
    ///     .high(101.0)
    ///     .low(99.0)
    ///     .close(100.5)
    ///     .build()
    ///     .unwrap();
    ///
    /// let never = |_: &Candle, _: &Position, _: &[Candle]| -> Option<Order> { None };
    /// let report = Backtest::new(config, never).unwrap().run(vec![candle]).unwrap();
    /// assert_eq!(report.ending_equity(), 10_000.0);
    /// ```
    pub fn new(config: BacktestConfig, strategy: S) -> Result<Self> {
        config.validate()?;
        let equity = EquityTracker::new(config.starting_equity())?;
        let warmup = WarmupTracker::new(config.warmup_candles());

        Ok(Self {
            config,
            strategy,
            state: RunState::Init,
            warmup,
            equity,
            position: Position::flat(),
            stop: None,
            pending: None,
            history: Vec::new(),
            curve: Vec::new(),
            trades: Vec::new(),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Current position.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Stop guarding the open position, if any.
    pub fn trailing_stop(&self) -> Option<&TrailingStop> {
        self.stop.as_ref()
    }

    /// Runs over already aggregated candles, ascending by `open_time`.
    pub fn run<I>(self, candles: I) -> Result<BacktestReport>
    where
        I: IntoIterator<Item = Candle>,
    {
        self.run_stream(candles.into_iter().map(Ok))
    }

    /// Aggregates raw samples with the configured interval and runs over the result.
    ///
    /// The first malformed sample aborts the run.
    pub fn run_samples<I>(self, samples: I) -> Result<BacktestReport>
    where
        I: IntoIterator<Item = Sample>,
    {
        let aggregator = CandleAggregator::new(self.config.candle_interval_sec())?;
        self.run_stream(aggregator.aggregate(samples))
    }

    fn run_stream<I>(mut self, candles: I) -> Result<BacktestReport>
    where
        I: Iterator<Item = Result<Candle>>,
    {
        for candle in candles {
            self.step(candle?)?;
        }
        Ok(self.finish())
    }

    /// Feeds one candle: pending fill, trailing stop, strategy, then mark-to-market.
    ///
    /// Candles must arrive with strictly increasing `open_time`. Call [`finish`](Self::finish)
    /// after the last one.
    pub fn step(&mut self, candle: Candle) -> Result<()> {
        if self.state == RunState::Init {
            info!(
                "backtest start: interval {}s, warm-up {} candles, equity {:.2}",
                self.config.candle_interval_sec(),
                self.warmup.required(),
                self.equity.starting_equity()
            );
            self.state = RunState::Warmup;
        }

        if let Some(previous) = self.history.last()
            && candle.open_time() <= previous.open_time()
        {
            return Err(Error::MalformedCandle(format!(
                "open_time {} does not follow {}",
                candle.open_time(),
                previous.open_time()
            )));
        }
        self.history.push(candle);

        if self.warmup.is_ready() {
            if self.state != RunState::Active {
                info!("warm-up complete after {} candles", self.warmup.observed());
                self.state = RunState::Active;
            }
            self.trade(&candle)?;
        }
        self.warmup.observe(&candle);

        self.equity.mark(&candle, &self.position);
        self.curve.push(self.equity.point(candle.open_time()));
        Ok(())
    }

    fn trade(&mut self, candle: &Candle) -> Result<()> {
        if let Some(order) = self.pending.take() {
            self.apply_order(order, candle.open(), candle)?;
        }

        if self.apply_stop(candle) {
            return Ok(());
        }

        let Some(order) = self.strategy.decide(candle, &self.position, &self.history) else {
            return Ok(());
        };
        order.validate()?;
        match self.config.fill() {
            FillPrice::Close => self.apply_order(order, candle.close(), candle),
            FillPrice::NextOpen => {
                self.pending = Some(order);
                Ok(())
            }
        }
    }

    /// Returns true when the stop closed the position.
    fn apply_stop(&mut self, candle: &Candle) -> bool {
        let Some(stop) = self.stop.as_mut() else {
            return false;
        };

        match stop.on_candle(candle) {
            StopEvent::Triggered(fill) => {
                self.close_position(fill, candle, ExitReason::TrailingStop);
                true
            }
            StopEvent::Moved { from, to } => {
                debug!("{}: trailing stop {from:.4} -> {to:.4}", candle.open_time());
                false
            }
            StopEvent::Held => false,
        }
    }

    fn apply_order(&mut self, order: Order, price: f64, candle: &Candle) -> Result<()> {
        let current = self.position.side();
        match order {
            Order::Close if current == Side::Flat => {
                debug!("{}: close ignored, no open position", candle.open_time());
            }
            Order::Close => self.close_position(price, candle, ExitReason::Strategy),
            _ if current == order.side() => {
                debug!("{}: {order:?} ignored, already {current:?}", candle.open_time());
            }
            _ => {
                if current != Side::Flat {
                    self.close_position(price, candle, ExitReason::Reverse);
                }
                self.open_position(order.side(), price, order.size(), candle)?;
            }
        }
        Ok(())
    }

    fn open_position(&mut self, side: Side, price: f64, size: f64, candle: &Candle) -> Result<()> {
        let stop = TrailingStop::new(
            side,
            price,
            self.config.trailing_distance_percent(),
            self.config.trailing_step_percent(),
        )?;
        debug!(
            "{}: open {side:?} {size} @ {price:.4}, stop {:.4}",
            candle.open_time(),
            stop.stop_price()
        );
        self.position = Position::from((side, price, size, candle.open_time()));
        self.stop = Some(stop);
        Ok(())
    }

    fn close_position(&mut self, price: f64, candle: &Candle, exit: ExitReason) {
        let pnl = self.equity.realize(price, &self.position);
        debug!(
            "{}: close {:?} @ {price:.4} ({exit:?}), pnl {pnl:.4}",
            candle.open_time(),
            self.position.side()
        );
        self.trades
            .push(Trade::new(&self.position, price, candle.open_time(), pnl, exit));
        self.position = Position::flat();
        self.stop = None;
    }

    /// Ends the run: drops an unfilled order, closes the open position at the last close
    /// and returns the report. The run is [`RunState::Done`] afterwards.
    ///
    /// The last equity point is rewritten after the close so the curve ends fully realized.
    pub fn finish(mut self) -> BacktestReport {
        if let Some(order) = self.pending.take() {
            debug!("dropping unfilled {order:?} at end of data");
        }
        if let Some(last) = self.history.last().copied()
            && !self.position.is_flat()
        {
            self.close_position(last.close(), &last, ExitReason::EndOfData);
            self.equity.mark(&last, &self.position);
            if let Some(point) = self.curve.last_mut() {
                *point = self.equity.point(last.open_time());
            }
        }
        self.state = RunState::Done;

        let required = self.warmup.required();
        let available = self.warmup.observed();
        let status = if available <= required {
            warn!("insufficient data: warm-up requires {required} candles, got {available}");
            RunStatus::InsufficientData { required, available }
        } else {
            RunStatus::Completed
        };

        info!(
            "backtest done: {} candles, {} trades, equity {:.2}",
            available,
            self.trades.len(),
            self.equity.equity()
        );

        BacktestReport {
            state: self.state,
            status,
            ending_equity: self.equity.equity(),
            realized_pnl: self.equity.realized_pnl(),
            config: self.config,
            curve: self.curve,
            trades: self.trades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Duration, Utc};
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_100, 0).unwrap()
    }

    fn candles(rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        rows.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| {
                CandleBuilder::builder()
                    .open_time(start() + Duration::seconds(300 * i as i64))
                    .open(open)
                    .high(high)
                    .low(low)
                    .close(close)
                    .volume(1.0)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    fn config(warmup_sec: u64) -> BacktestConfig {
        BacktestConfig::builder()
            .candle_interval_sec(300)
            .warmup_sec(warmup_sec)
            .trailing_distance_percent(0.01)
            .trailing_step_percent(0.002)
            .starting_equity(10_000.0)
            .build()
            .unwrap()
    }

    /// Goes long on the first active candle, then stays silent.
    fn long_once(size: f64) -> impl FnMut(&Candle, &Position, &[Candle]) -> Option<Order> {
        let mut done = false;
        move |_, _, _| {
            if done {
                return None;
            }
            done = true;
            Some(Order::Long(size))
        }
    }

    fn rally_then_drop() -> Vec<Candle> {
        candles(&[
            (99.5, 100.2, 99.4, 100.0),
            (100.0, 102.0, 99.5, 101.5),
            (101.5, 104.0, 101.2, 103.5),
            (103.5, 106.0, 103.2, 105.5),
            (105.5, 108.0, 105.2, 107.5),
            (107.5, 110.0, 107.2, 109.5),
            (109.5, 109.6, 105.0, 105.0),
            (105.0, 105.5, 104.5, 105.2),
        ])
    }

    #[test]
    fn scenario_trailing_stop_long_profit() {
        init_logger();
        let report = Backtest::new(config(0), long_once(1.0))
            .unwrap()
            .run(rally_then_drop())
            .unwrap();

        assert_eq!(report.status(), RunStatus::Completed);
        assert_eq!(report.trades().len(), 1);

        let trade = report.trades()[0];
        assert_eq!(trade.side(), Side::Long);
        assert_eq!(trade.entry_price(), 100.0);
        assert_eq!(trade.exit(), ExitReason::TrailingStop);
        // best price 110, 1% below
        assert!((trade.exit_price() - 108.9).abs() < 1e-9);
        assert_eq!(trade.pnl(), (trade.exit_price() - 100.0) * 1.0);
        assert_eq!(trade.closed_at(), start() + Duration::seconds(300 * 6));

        assert_eq!(report.curve().len(), 8);
        assert_eq!(report.ending_equity(), 10_000.0 + trade.pnl());
        let last = report.curve().last().unwrap();
        assert_eq!(last.unrealized_pnl(), 0.0);
        assert_eq!(last.equity(), report.ending_equity());
    }

    #[test]
    fn scenario_unrealized_pnl_tracks_close() {
        let report = Backtest::new(config(0), long_once(2.0))
            .unwrap()
            .run(rally_then_drop())
            .unwrap();

        let curve = report.curve();
        // opened on the first close, nothing to mark yet
        assert_eq!(curve[0].unrealized_pnl(), 0.0);
        assert_eq!(curve[1].unrealized_pnl(), 3.0);
        assert_eq!(curve[1].equity(), 10_003.0);
        assert_eq!(curve[5].unrealized_pnl(), 19.0);
        assert_eq!(curve[6].unrealized_pnl(), 0.0);
        assert_eq!(curve[6].realized_pnl(), report.realized_pnl());
    }

    #[test]
    fn scenario_stop_price_never_regresses() {
        let data = rally_then_drop();
        let mut backtest = Backtest::new(config(0), long_once(1.0)).unwrap();
        let mut stops = Vec::new();
        for candle in &data {
            backtest.step(*candle).unwrap();
            if let Some(stop) = backtest.trailing_stop() {
                stops.push(stop.stop_price());
            }
        }
        assert!(stops.len() >= 5);
        assert!(stops.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn scenario_short_trailing_stop() {
        let data = candles(&[
            (100.5, 100.6, 99.8, 100.0),
            (100.0, 100.4, 95.0, 95.5),
            (95.5, 96.5, 95.2, 96.0),
            (96.0, 97.0, 95.8, 96.8),
        ]);
        let strategy = |_: &Candle, position: &Position, history: &[Candle]| {
            (history.len() == 1 && position.is_flat()).then_some(Order::Short(1.0))
        };
        let report = Backtest::new(config(0), strategy).unwrap().run(data).unwrap();

        let trade = report.trades()[0];
        assert_eq!(trade.side(), Side::Short);
        assert_eq!(trade.exit(), ExitReason::TrailingStop);
        // best 95, stop 95.95, crossed by the 96.5 high of the third candle
        assert!((trade.exit_price() - 95.95).abs() < 1e-9);
        assert!(trade.pnl() > 0.0);
    }

    #[test]
    fn scenario_gap_through_stop_fills_at_open() {
        let data = candles(&[(99.5, 100.2, 99.4, 100.0), (95.0, 96.0, 94.0, 95.5)]);
        let report = Backtest::new(config(0), long_once(1.0)).unwrap().run(data).unwrap();

        let trade = report.trades()[0];
        assert_eq!(trade.exit(), ExitReason::TrailingStop);
        assert_eq!(trade.exit_price(), 95.0);
        assert_eq!(trade.pnl(), -5.0);
        assert_eq!(report.ending_equity(), 9_995.0);
    }

    #[test]
    fn scenario_warmup_suppresses_strategy() {
        let data = rally_then_drop();
        let mut seen = Vec::new();
        let mut strategy = |_: &Candle, _: &Position, history: &[Candle]| -> Option<Order> {
            seen.push(history.len());
            None
        };
        // 3 candles of 300s
        let report = Backtest::new(config(900), &mut strategy).unwrap().run(data).unwrap();

        assert_eq!(seen, vec![4, 5, 6, 7, 8]);
        assert_eq!(report.curve().len(), 8);
        assert!(report.curve().iter().all(|p| p.equity() == 10_000.0));
    }

    #[test]
    fn scenario_warmup_flip_is_price_independent() {
        let flip = |data: Vec<Candle>| {
            let mut first = None;
            let mut strategy = |_: &Candle, _: &Position, history: &[Candle]| -> Option<Order> {
                first.get_or_insert(history.len());
                None
            };
            Backtest::new(config(1_200), &mut strategy).unwrap().run(data).unwrap();
            first
        };

        let calm = candles(&[(1.0, 1.0, 1.0, 1.0); 8]);
        assert_eq!(flip(rally_then_drop()), Some(5));
        assert_eq!(flip(calm), Some(5));
    }

    #[test]
    fn scenario_insufficient_data() {
        init_logger();
        let data = rally_then_drop();
        let report = Backtest::new(config(300 * 20), long_once(1.0))
            .unwrap()
            .run(data)
            .unwrap();

        assert_eq!(
            report.status(),
            RunStatus::InsufficientData {
                required: 20,
                available: 8
            }
        );
        assert!(matches!(
            report.status().as_error(),
            Some(Error::InsufficientData { required: 20, available: 8 })
        ));
        assert!(report.trades().is_empty());
        assert_eq!(report.ending_equity(), report.starting_equity());

        let summary = report.summary();
        assert_eq!(summary.num_trades(), 0);
        assert_eq!(summary.ending_equity(), 10_000.0);
    }

    #[test]
    fn scenario_empty_input() {
        let report = Backtest::new(config(0), long_once(1.0))
            .unwrap()
            .run(Vec::new())
            .unwrap();
        assert!(report.curve().is_empty());
        assert_eq!(report.ending_equity(), 10_000.0);
        assert!(report.status().as_error().is_some());
    }

    #[test]
    fn scenario_force_close_at_end() {
        let config = BacktestConfig::builder()
            .warmup_sec(0)
            .trailing_distance_percent(0.2)
            .trailing_step_percent(0.01)
            .build()
            .unwrap();
        let data = candles(&[(99.0, 100.0, 98.0, 100.0), (100.0, 104.0, 99.0, 101.0), (101.0, 104.0, 100.0, 103.0)]);
        let report = Backtest::new(config, long_once(1.0)).unwrap().run(data).unwrap();

        assert_eq!(report.trades().len(), 1);
        let trade = report.trades()[0];
        assert_eq!(trade.exit(), ExitReason::EndOfData);
        assert_eq!(trade.exit_price(), 103.0);
        assert_eq!(trade.pnl(), 3.0);

        let last = report.curve().last().unwrap();
        assert_eq!(last.unrealized_pnl(), 0.0);
        assert_eq!(last.realized_pnl(), 3.0);
        assert_eq!(last.equity(), 10_003.0);
    }

    #[test]
    fn scenario_reverse_and_close() {
        let data = candles(&[
            (99.0, 100.0, 99.0, 100.0),
            (100.0, 100.5, 99.5, 100.2),
            (100.2, 100.5, 99.6, 99.8),
            (99.8, 100.0, 99.5, 99.6),
            (99.6, 99.9, 99.4, 99.5),
        ]);
        let strategy = |_: &Candle, _: &Position, history: &[Candle]| match history.len() {
            1 => Some(Order::Long(1.0)),
            2 => Some(Order::Long(5.0)),
            3 => Some(Order::Short(2.0)),
            4 => Some(Order::Close),
            5 => Some(Order::Close),
            _ => None,
        };
        let report = Backtest::new(config(0), strategy).unwrap().run(data).unwrap();

        let exits: Vec<_> = report.trades().iter().map(|t| t.exit()).collect();
        assert_eq!(exits, vec![ExitReason::Reverse, ExitReason::Strategy]);

        let long = report.trades()[0];
        assert_eq!(long.size(), 1.0);
        assert_eq!(long.exit_price(), 99.8);

        let short = report.trades()[1];
        assert_eq!(short.side(), Side::Short);
        assert_eq!(short.size(), 2.0);
        assert_eq!(short.entry_price(), 99.8);
        assert_eq!(short.exit_price(), 99.6);
    }

    #[test]
    fn scenario_stop_takes_precedence_over_strategy() {
        let data = candles(&[(99.5, 100.2, 99.4, 100.0), (99.5, 99.6, 98.0, 98.5), (98.5, 99.0, 98.0, 98.8)]);
        let mut calls = Vec::new();
        let mut strategy = |_: &Candle, _: &Position, history: &[Candle]| -> Option<Order> {
            calls.push(history.len());
            match history.len() {
                1 => Some(Order::Long(1.0)),
                _ => Some(Order::Close),
            }
        };
        let report = Backtest::new(config(0), &mut strategy).unwrap().run(data).unwrap();

        assert_eq!(calls, vec![1, 3]);
        assert_eq!(report.trades().len(), 1);
        assert_eq!(report.trades()[0].exit(), ExitReason::TrailingStop);
    }

    #[test]
    fn scenario_next_open_fill() {
        let config = BacktestConfig::builder()
            .warmup_sec(0)
            .trailing_distance_percent(0.05)
            .trailing_step_percent(0.01)
            .fill(FillPrice::NextOpen)
            .build()
            .unwrap();
        let data = candles(&[(99.0, 100.0, 98.0, 100.0), (100.5, 102.0, 100.0, 101.0), (101.0, 102.0, 100.5, 101.5)]);
        let strategy = |_: &Candle, position: &Position, history: &[Candle]| match history.len() {
            1 => Some(Order::Long(1.0)),
            2 => {
                assert_eq!(position.entry_price(), 100.5);
                Some(Order::Close)
            }
            _ => None,
        };
        let report = Backtest::new(config, strategy).unwrap().run(data).unwrap();

        let trade = report.trades()[0];
        assert_eq!(trade.entry_price(), 100.5);
        assert_eq!(trade.exit_price(), 101.0);
        assert_eq!(trade.exit(), ExitReason::Strategy);
    }

    #[test]
    fn scenario_invalid_order_aborts() {
        let strategy = |_: &Candle, _: &Position, _: &[Candle]| Some(Order::Long(-1.0));
        let result = Backtest::new(config(0), strategy).unwrap().run(rally_then_drop());
        assert!(matches!(result, Err(Error::InvalidOrder(_))));
    }

    #[test]
    fn scenario_out_of_order_candles() {
        let mut data = rally_then_drop();
        data.swap(2, 3);
        let result = Backtest::new(config(0), long_once(1.0)).unwrap().run(data);
        assert!(matches!(result, Err(Error::MalformedCandle(_))));
    }

    #[test]
    fn scenario_invalid_config() {
        let config = BacktestConfig::default();
        let strategy = |_: &Candle, _: &Position, _: &[Candle]| -> Option<Order> { None };
        assert!(Backtest::new(config, strategy).is_ok());
        assert!(BacktestConfig::builder().trailing_step_percent(1.0).build().is_err());
    }

    #[test]
    fn scenario_run_samples() {
        let config = BacktestConfig::builder()
            .candle_interval_sec(60)
            .warmup_sec(0)
            .build()
            .unwrap();
        let samples = (0..600).map(|i| Sample::from((i * 5, 100.0 + (i % 7) as f64 * 0.1, 1.0)));
        let strategy = |_: &Candle, _: &Position, _: &[Candle]| -> Option<Order> { None };
        let report = Backtest::new(config, strategy).unwrap().run_samples(samples).unwrap();

        assert_eq!(report.curve().len(), 50);
        for point in report.curve() {
            assert_eq!(point.timestamp().timestamp() % 60, 0);
        }
    }

    #[test]
    fn scenario_run_samples_malformed() {
        let samples = vec![Sample::from((600, 1.0)), Sample::from((0, 1.0))];
        let strategy = |_: &Candle, _: &Position, _: &[Candle]| -> Option<Order> { None };
        let result = Backtest::new(config(0), strategy).unwrap().run_samples(samples);
        assert!(matches!(result, Err(Error::MalformedSample { timestamp: 0, .. })));
    }

    #[test]
    fn state_transitions() {
        let strategy = |_: &Candle, _: &Position, _: &[Candle]| -> Option<Order> { None };
        let data = rally_then_drop();
        let mut backtest = Backtest::new(config(600), strategy).unwrap();
        assert_eq!(backtest.state(), RunState::Init);

        let mut states = Vec::new();
        for candle in &data {
            backtest.step(*candle).unwrap();
            states.push(backtest.state());
        }
        assert_eq!(&states[..3], &[RunState::Warmup, RunState::Warmup, RunState::Active]);
        assert!(states[3..].iter().all(|s| *s == RunState::Active));
        assert_eq!(backtest.equity(), 10_000.0);

        let report = backtest.finish();
        assert_eq!(report.state(), RunState::Done);
        assert_eq!(report.status(), RunStatus::Completed);
    }

    #[test]
    fn finish_closes_stepped_run() {
        let stepped = {
            let mut backtest = Backtest::new(config(0), long_once(2.0)).unwrap();
            for candle in candles(&[(99.0, 100.0, 98.0, 100.0), (100.0, 101.0, 99.5, 100.8), (100.8, 101.5, 100.2, 101.2)]) {
                backtest.step(candle).unwrap();
            }
            assert_eq!(backtest.position().side(), Side::Long);
            backtest.finish()
        };

        let last = stepped.curve().last().unwrap();
        assert_eq!(stepped.trades()[0].exit(), ExitReason::EndOfData);
        assert_eq!(last.unrealized_pnl(), 0.0);
        assert_eq!(last.realized_pnl(), stepped.trades()[0].pnl());
        assert_eq!(last.equity(), stepped.ending_equity());
        assert_eq!(stepped.curve().len(), 3);
    }

    #[test]
    fn step_rejects_unordered_candle() {
        let strategy = |_: &Candle, _: &Position, _: &[Candle]| -> Option<Order> { None };
        let data = rally_then_drop();
        let mut backtest = Backtest::new(config(0), strategy).unwrap();
        backtest.step(data[1]).unwrap();
        assert!(matches!(backtest.step(data[0]), Err(Error::MalformedCandle(_))));
        assert!(matches!(backtest.step(data[1]), Err(Error::MalformedCandle(_))));
    }

    fn random_walk(rng: &mut StdRng, n: usize) -> Vec<Candle> {
        let mut price: f64 = 100.0;
        (0..n)
            .map(|i| {
                let open = price;
                price = (price * (1.0 + rng.random_range(-0.015..0.015))).max(1.0);
                let high = open.max(price) * (1.0 + rng.random_range(0.0..0.005));
                let low = open.min(price) * (1.0 - rng.random_range(0.0..0.005));
                CandleBuilder::builder()
                    .open_time(start() + Duration::seconds(300 * i as i64))
                    .open(open)
                    .high(high)
                    .low(low)
                    .close(price)
                    .build()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn equity_reconciles_with_trades() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let data = random_walk(&mut rng, 400);
            let mut decisions = StdRng::seed_from_u64(rng.random());
            let strategy = move |_: &Candle, _: &Position, _: &[Candle]| match decisions.random_range(0..20) {
                0 => Some(Order::Long(decisions.random_range(0.1..3.0))),
                1 => Some(Order::Short(decisions.random_range(0.1..3.0))),
                2 => Some(Order::Close),
                _ => None,
            };
            let report = Backtest::new(config(1_500), strategy).unwrap().run(data.clone()).unwrap();

            let realized: f64 = report.trades().iter().map(|t| t.pnl()).sum();
            assert_eq!(report.ending_equity(), report.starting_equity() + realized);
            assert_eq!(report.curve().len(), data.len());
            assert_eq!(report.curve().last().unwrap().unrealized_pnl(), 0.0);

            for trade in report.trades().iter().filter(|t| t.exit() == ExitReason::TrailingStop) {
                let candle = data.iter().find(|c| c.open_time() == trade.closed_at()).unwrap();
                match trade.side() {
                    Side::Long => assert!(candle.low() <= trade.exit_price()),
                    _ => assert!(candle.high() >= trade.exit_price()),
                }
            }
        }
    }
}
