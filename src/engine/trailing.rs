use crate::FractionCalculus;
use crate::engine::{Candle, Side};
use crate::errors::{Error, Result};

/// Outcome of feeding one candle to a [`TrailingStop`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopEvent {
    /// The adverse extreme crossed the stop; close at the given fill price.
    Triggered(f64),
    /// The favorable extreme improved enough to ratchet the stop.
    Moved {
        /// Stop before the adjustment.
        from: f64,
        /// Stop after the adjustment.
        to: f64,
    },
    /// Nothing changed.
    Held,
}

/// Per-position trailing stop.
///
/// The stop only ever moves in the position's favor: up for a long, down for a short.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingStop {
    side: Side,
    distance_percent: f64,
    step_percent: f64,
    stop_price: f64,
    best_price_seen: f64,
}

impl TrailingStop {
    /// Arms a stop for a position entered at `entry_price`.
    pub fn new(side: Side, entry_price: f64, distance_percent: f64, step_percent: f64) -> Result<Self> {
        let stop_price = match side {
            Side::Long => entry_price.sub_fraction(distance_percent),
            Side::Short => entry_price.add_fraction(distance_percent),
            Side::Flat => return Err(Error::InvalidOrder("cannot trail a flat position".to_string())),
        };

        Ok(Self {
            side,
            distance_percent,
            step_percent,
            stop_price,
            best_price_seen: entry_price,
        })
    }

    /// Current stop price.
    pub fn stop_price(&self) -> f64 {
        self.stop_price
    }

    /// Most favorable price recorded at the last adjustment.
    pub fn best_price_seen(&self) -> f64 {
        self.best_price_seen
    }

    /// Fill price if `candle` crosses the stop.
    ///
    /// A candle that opens beyond the stop fills at its open, the worse of the two prices.
    pub fn check(&self, candle: &Candle) -> Option<f64> {
        match self.side {
            Side::Long if candle.low() <= self.stop_price => Some(candle.open().min(self.stop_price)),
            Side::Short if candle.high() >= self.stop_price => Some(candle.open().max(self.stop_price)),
            _ => None,
        }
    }

    /// Ratchets the stop with the candle's favorable extreme.
    ///
    /// Returns the previous stop when it moved.
    pub fn update(&mut self, candle: &Candle) -> Option<f64> {
        let previous = self.stop_price;
        match self.side {
            Side::Long => {
                let extreme = candle.high();
                if extreme < self.best_price_seen.add_fraction(self.step_percent) {
                    return None;
                }
                self.best_price_seen = extreme;
                self.stop_price = previous.max(extreme.sub_fraction(self.distance_percent));
            }
            Side::Short => {
                let extreme = candle.low();
                if extreme > self.best_price_seen.sub_fraction(self.step_percent) {
                    return None;
                }
                self.best_price_seen = extreme;
                self.stop_price = previous.min(extreme.add_fraction(self.distance_percent));
            }
            Side::Flat => return None,
        }
        (self.stop_price != previous).then_some(previous)
    }

    /// Trigger test against the stop as it stood at the candle's open, then the ratchet.
    pub fn on_candle(&mut self, candle: &Candle) -> StopEvent {
        if let Some(fill) = self.check(candle) {
            return StopEvent::Triggered(fill);
        }
        match self.update(candle) {
            Some(from) => StopEvent::Moved {
                from,
                to: self.stop_price,
            },
            None => StopEvent::Held,
        }
    }
}
