use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Direction of the open position.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Side {
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
    /// No exposure.
    #[default]
    Flat,
}

/// The run's single position slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    side: Side,
    entry_price: f64,
    size: f64,
    opened_at: DateTime<Utc>,
}

impl From<(Side, f64, f64, DateTime<Utc>)> for Position {
    fn from((side, entry_price, size, opened_at): (Side, f64, f64, DateTime<Utc>)) -> Self {
        Self {
            side,
            entry_price,
            size,
            opened_at,
        }
    }
}

impl Position {
    /// An empty slot.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Current side.
    pub fn side(&self) -> Side {
        self.side
    }

    /// True when no position is held.
    pub fn is_flat(&self) -> bool {
        self.side == Side::Flat
    }

    /// Average fill price of the entry.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Quantity held.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Time of the entry fill.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Profit or loss if the position were closed at `price`.
    pub fn pnl_at(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => (price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - price) * self.size,
            Side::Flat => 0.0,
        }
    }
}

/// Why a position was closed.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The trailing stop was crossed.
    TrailingStop,
    /// The strategy asked to close.
    Strategy,
    /// The strategy asked for the opposite side.
    Reverse,
    /// Data ran out; closed at the last close.
    EndOfData,
}

/// A closed round trip.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    side: Side,
    size: f64,
    entry_price: f64,
    exit_price: f64,
    opened_at: DateTime<Utc>,
    closed_at: DateTime<Utc>,
    pnl: f64,
    exit: ExitReason,
}

impl Trade {
    pub(crate) fn new(position: &Position, exit_price: f64, closed_at: DateTime<Utc>, pnl: f64, exit: ExitReason) -> Self {
        Self {
            side: position.side(),
            size: position.size(),
            entry_price: position.entry_price(),
            exit_price,
            opened_at: position.opened_at(),
            closed_at,
            pnl,
            exit,
        }
    }

    /// Side of the closed position.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Quantity traded.
    pub fn size(&self) -> f64 {
        self.size
    }

    /// Entry fill price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Exit fill price.
    pub fn exit_price(&self) -> f64 {
        self.exit_price
    }

    /// Time of the entry.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// Time of the exit.
    pub fn closed_at(&self) -> DateTime<Utc> {
        self.closed_at
    }

    /// Realized profit or loss.
    pub fn pnl(&self) -> f64 {
        self.pnl
    }

    /// Why the position was closed.
    pub fn exit(&self) -> ExitReason {
        self.exit
    }
}

#[cfg(test)]
#[test]
fn flat_position_has_no_pnl() {
    let position = Position::flat();
    assert!(position.is_flat());
    assert_eq!(position.pnl_at(1234.0), 0.0);
}

#[cfg(test)]
#[test]
fn long_and_short_pnl() {
    let long = Position::from((Side::Long, 100.0, 2.0, DateTime::default()));
    assert_eq!(long.pnl_at(110.0), 20.0);
    assert_eq!(long.pnl_at(95.0), -10.0);

    let short = Position::from((Side::Short, 100.0, 2.0, DateTime::default()));
    assert_eq!(short.pnl_at(110.0), -20.0);
    assert_eq!(short.pnl_at(95.0), 10.0);
}
