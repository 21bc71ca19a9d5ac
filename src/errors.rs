/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring or running a backtest.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A raw sample is out of order or carries an unusable price/volume.
    #[error("Malformed sample at {timestamp}: {reason}")]
    MalformedSample {
        /// Timestamp of the offending sample (epoch seconds).
        timestamp: i64,
        /// What is wrong with it.
        reason: String,
    },

    /// A candle is invalid or breaks the ascending `open_time` ordering.
    ///
    /// Raw samples report out-of-order or unusable input as [`Error::MalformedSample`]; candles
    /// fed directly (or loaded from a file) report the same kind of problem, and missing fields,
    /// with this variant. Callers treating malformed input as one category should match both.
    #[error("Malformed candle: {0}")]
    MalformedCandle(String),

    /// Fewer candles than the warm-up requires; the run still completes without trading.
    #[error("Insufficient data: warm-up requires {required} candles, got {available}")]
    InsufficientData {
        /// Number of candles the warm-up needs.
        required: usize,
        /// Number of candles the run consumed.
        available: usize,
    },

    /// A configuration value is out of its valid range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The strategy emitted an order that cannot be executed.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error occurred.
    #[cfg(feature = "serde")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
