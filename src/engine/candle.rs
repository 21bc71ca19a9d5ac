use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::errors::{Error, Result};

/// OHLCV aggregate of one time bucket.
///
/// Always satisfies `low <= min(open, close) <= max(open, close) <= high`;
/// the only way to obtain one is through [`CandleBuilder`].
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    #[cfg_attr(feature = "serde", serde(with = "chrono::serde::ts_seconds"))]
    open_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Candle {
    /// Start of the bucket.
    pub fn open_time(&self) -> DateTime<Utc> {
        self.open_time
    }

    /// First price of the bucket.
    pub fn open(&self) -> f64 {
        self.open
    }

    /// Highest price of the bucket.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Lowest price of the bucket.
    pub fn low(&self) -> f64 {
        self.low
    }

    /// Last price of the bucket.
    pub fn close(&self) -> f64 {
        self.close
    }

    /// Traded volume of the bucket.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// Builder for [`Candle`]; `build` enforces the OHLC invariant.
#[derive(Debug, Default)]
pub struct CandleBuilder {
    open_time: Option<DateTime<Utc>>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

impl CandleBuilder {
    /// Starts an empty builder.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets the bucket start.
    pub fn open_time(mut self, open_time: DateTime<Utc>) -> Self {
        self.open_time = Some(open_time);
        self
    }

    /// Sets the open price.
    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    /// Sets the high price.
    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    /// Sets the low price.
    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    /// Sets the close price.
    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    /// Sets the volume. Defaults to zero when omitted.
    pub fn volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Validates the fields and returns the candle.
    pub fn build(self) -> Result<Candle> {
        let missing = |name: &str| Error::MalformedCandle(format!("missing field `{name}`"));

        let open_time = self.open_time.ok_or_else(|| missing("open_time"))?;
        let open = self.open.ok_or_else(|| missing("open"))?;
        let high = self.high.ok_or_else(|| missing("high"))?;
        let low = self.low.ok_or_else(|| missing("low"))?;
        let close = self.close.ok_or_else(|| missing("close"))?;
        let volume = self.volume.unwrap_or(0.0);

        for (name, value) in [("open", open), ("high", high), ("low", low), ("close", close)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::MalformedCandle(format!("{name} must be positive (got: {value})")));
            }
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(Error::MalformedCandle(format!("volume must not be negative (got: {volume})")));
        }
        if low > open.min(close) || open.max(close) > high {
            return Err(Error::MalformedCandle(format!(
                "expected low <= open/close <= high (o: {open}, h: {high}, l: {low}, c: {close})"
            )));
        }

        Ok(Candle {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// A raw price observation fed to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    timestamp: i64,
    price: f64,
    volume: f64,
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, price): (i64, f64)) -> Self {
        Self {
            timestamp,
            price,
            volume: 0.0,
        }
    }
}

impl From<(i64, f64, f64)> for Sample {
    fn from((timestamp, price, volume): (i64, f64, f64)) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }
}

impl Sample {
    /// Epoch seconds of the observation.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Observed price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Observed volume, zero when the source has none.
    pub fn volume(&self) -> f64 {
        self.volume
    }
}
