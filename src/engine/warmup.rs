use crate::engine::Candle;

/// Counts consumed candles until the configured warm-up is reached.
#[derive(Debug, Clone)]
pub struct WarmupTracker {
    required: usize,
    observed: usize,
}

impl WarmupTracker {
    /// Creates a tracker that becomes ready after `required` candles.
    pub fn new(required: usize) -> Self {
        Self { required, observed: 0 }
    }

    /// Records one consumed candle.
    pub fn observe(&mut self, _candle: &Candle) {
        self.observed = self.observed.saturating_add(1);
    }

    /// True once at least `required` candles have been observed.
    pub fn is_ready(&self) -> bool {
        self.observed >= self.required
    }

    /// Number of candles the warm-up needs.
    pub fn required(&self) -> usize {
        self.required
    }

    /// Number of candles observed so far.
    pub fn observed(&self) -> usize {
        self.observed
    }
}
