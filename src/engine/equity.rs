use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::engine::{Candle, Position};
use crate::errors::{Error, Result};

/// One observation of the equity curve.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    #[cfg_attr(feature = "serde", serde(with = "chrono::serde::ts_seconds"))]
    timestamp: DateTime<Utc>,
    equity: f64,
    realized_pnl: f64,
    unrealized_pnl: f64,
}

impl EquityPoint {
    /// Candle open time the observation belongs to.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Starting equity plus realized and unrealized P&L.
    pub fn equity(&self) -> f64 {
        self.equity
    }

    /// Cumulative realized P&L.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Mark-to-market P&L of the open position.
    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
    }
}

/// Cash and P&L accounting of a run.
#[derive(Debug, Clone)]
pub struct EquityTracker {
    starting_equity: f64,
    realized_pnl: f64,
    unrealized_pnl: f64,
}

impl EquityTracker {
    /// Creates a tracker with `starting_equity` in cash.
    pub fn new(starting_equity: f64) -> Result<Self> {
        if !starting_equity.is_finite() || starting_equity <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "starting_equity must be positive (got: {starting_equity})"
            )));
        }

        Ok(Self {
            starting_equity,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
        })
    }

    /// Equity at run start.
    pub fn starting_equity(&self) -> f64 {
        self.starting_equity
    }

    /// Cumulative realized P&L.
    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Mark-to-market P&L of the open position as of the last mark.
    pub fn unrealized_pnl(&self) -> f64 {
        self.unrealized_pnl
    }

    /// Starting equity plus realized P&L.
    pub fn cash(&self) -> f64 {
        self.starting_equity + self.realized_pnl
    }

    /// `starting_equity + realized_pnl + unrealized_pnl`.
    pub fn equity(&self) -> f64 {
        self.starting_equity + self.realized_pnl + self.unrealized_pnl
    }

    /// Values the open position at the candle's close.
    pub fn mark(&mut self, candle: &Candle, position: &Position) {
        self.unrealized_pnl = position.pnl_at(candle.close());
    }

    /// Books the P&L of closing `position` at `exit_price` and returns it.
    ///
    /// The caller must flatten the position afterwards; a flat position books nothing.
    pub fn realize(&mut self, exit_price: f64, position: &Position) -> f64 {
        let pnl = position.pnl_at(exit_price);
        self.realized_pnl += pnl;
        self.unrealized_pnl = 0.0;
        pnl
    }

    /// Snapshot of the current state.
    pub fn point(&self, timestamp: DateTime<Utc>) -> EquityPoint {
        EquityPoint {
            timestamp,
            equity: self.equity(),
            realized_pnl: self.realized_pnl,
            unrealized_pnl: self.unrealized_pnl,
        }
    }
}
