//! Run configuration.
//!
//! A [`BacktestConfig`] is built once, validated, and handed to the engine.
//! Nothing in the crate reads configuration from a global location.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Price at which strategy orders are filled.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FillPrice {
    /// Fill at the close of the candle the decision was made on.
    #[default]
    Close,
    /// Queue the order and fill it at the next candle's open.
    NextOpen,
}

/// Parameters of a single backtest run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    candle_interval_sec: u64,
    warmup_sec: u64,
    trailing_distance_percent: f64,
    trailing_step_percent: f64,
    starting_equity: f64,
    fill: FillPrice,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            candle_interval_sec: 300,
            warmup_sec: 29 * 300,
            trailing_distance_percent: 0.002,
            trailing_step_percent: 0.0005,
            starting_equity: 10_000.0,
            fill: FillPrice::Close,
        }
    }
}

impl BacktestConfig {
    /// Starts a builder seeded with the default values.
    pub fn builder() -> BacktestConfigBuilder {
        BacktestConfigBuilder::default()
    }

    /// Bucket width in seconds.
    pub fn candle_interval_sec(&self) -> u64 {
        self.candle_interval_sec
    }

    /// Warm-up duration in seconds.
    pub fn warmup_sec(&self) -> u64 {
        self.warmup_sec
    }

    /// Stop offset from the best price, as a fraction (0.01 for 1%).
    pub fn trailing_distance_percent(&self) -> f64 {
        self.trailing_distance_percent
    }

    /// Minimum favorable move before the stop is re-adjusted, as a fraction.
    pub fn trailing_step_percent(&self) -> f64 {
        self.trailing_step_percent
    }

    /// Equity at run start.
    pub fn starting_equity(&self) -> f64 {
        self.starting_equity
    }

    /// Execution price rule for strategy orders.
    pub fn fill(&self) -> FillPrice {
        self.fill
    }

    /// Number of candles consumed before trading is enabled.
    pub fn warmup_candles(&self) -> usize {
        self.warmup_sec.div_ceil(self.candle_interval_sec.max(1)) as usize
    }

    /// Checks every field against its valid range.
    pub fn validate(&self) -> Result<()> {
        if self.candle_interval_sec == 0 {
            return Err(Error::InvalidConfig("candle_interval_sec must be positive".to_string()));
        }
        if i64::try_from(self.candle_interval_sec).is_err() {
            return Err(Error::InvalidConfig(format!(
                "candle_interval_sec must not exceed {} (got: {})",
                i64::MAX,
                self.candle_interval_sec
            )));
        }
        check_fraction("trailing_distance_percent", self.trailing_distance_percent)?;
        check_fraction("trailing_step_percent", self.trailing_step_percent)?;
        if !self.starting_equity.is_finite() || self.starting_equity <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "starting_equity must be positive (got: {})",
                self.starting_equity
            )));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value >= 1.0 {
        return Err(Error::InvalidConfig(format!("{name} must be in (0, 1) (got: {value})")));
    }
    Ok(())
}

/// Chained setters for [`BacktestConfig`].
#[derive(Debug, Default)]
pub struct BacktestConfigBuilder {
    inner: BacktestConfig,
}

impl BacktestConfigBuilder {
    /// Sets the bucket width in seconds.
    pub fn candle_interval_sec(mut self, seconds: u64) -> Self {
        self.inner.candle_interval_sec = seconds;
        self
    }

    /// Sets the warm-up duration in seconds.
    pub fn warmup_sec(mut self, seconds: u64) -> Self {
        self.inner.warmup_sec = seconds;
        self
    }

    /// Sets the trailing distance (fraction).
    pub fn trailing_distance_percent(mut self, fraction: f64) -> Self {
        self.inner.trailing_distance_percent = fraction;
        self
    }

    /// Sets the trailing step (fraction).
    pub fn trailing_step_percent(mut self, fraction: f64) -> Self {
        self.inner.trailing_step_percent = fraction;
        self
    }

    /// Sets the starting equity.
    pub fn starting_equity(mut self, equity: f64) -> Self {
        self.inner.starting_equity = equity;
        self
    }

    /// Sets the execution price rule.
    pub fn fill(mut self, fill: FillPrice) -> Self {
        self.inner.fill = fill;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<BacktestConfig> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

#[cfg(test)]
#[test]
fn default_config_is_valid() {
    let config = BacktestConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.warmup_candles(), 29);
}

#[cfg(test)]
#[test]
fn warmup_candles_rounds_up() {
    let config = BacktestConfig::builder()
        .candle_interval_sec(300)
        .warmup_sec(301)
        .build()
        .unwrap();
    assert_eq!(config.warmup_candles(), 2);

    let config = BacktestConfig::builder().warmup_sec(0).build().unwrap();
    assert_eq!(config.warmup_candles(), 0);
}

#[cfg(test)]
#[test]
fn rejects_zero_interval() {
    let result = BacktestConfig::builder().candle_interval_sec(0).build();
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[cfg(test)]
#[test]
fn rejects_interval_beyond_timestamp_range() {
    let result = BacktestConfig::builder().candle_interval_sec(u64::MAX).build();
    assert!(matches!(result, Err(Error::InvalidConfig(msg)) if msg.contains("must not exceed")));

    let max = i64::MAX as u64;
    assert!(BacktestConfig::builder().candle_interval_sec(max).warmup_sec(0).build().is_ok());
}

#[cfg(test)]
#[test]
fn rejects_fractions_out_of_range() {
    for value in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
        let result = BacktestConfig::builder().trailing_distance_percent(value).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))), "distance {value}");

        let result = BacktestConfig::builder().trailing_step_percent(value).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))), "step {value}");
    }
}

#[cfg(test)]
#[test]
fn rejects_non_positive_equity() {
    for value in [0.0, -10.0, f64::INFINITY] {
        let result = BacktestConfig::builder().starting_equity(value).build();
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
