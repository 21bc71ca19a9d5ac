use chrono::DateTime;

use crate::engine::{Candle, CandleBuilder, Sample};
use crate::errors::{Error, Result};

/// Bucket being filled by the aggregator.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    start: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl Bucket {
    fn new(start: i64, sample: &Sample) -> Self {
        Self {
            start,
            open: sample.price(),
            high: sample.price(),
            low: sample.price(),
            close: sample.price(),
            volume: sample.volume(),
        }
    }

    fn update(&mut self, sample: &Sample) {
        self.high = self.high.max(sample.price());
        self.low = self.low.min(sample.price());
        self.close = sample.price();
        self.volume += sample.volume();
    }

    fn into_candle(self) -> Result<Candle> {
        let open_time = DateTime::from_timestamp(self.start, 0).ok_or_else(|| Error::MalformedSample {
            timestamp: self.start,
            reason: "timestamp out of range".to_string(),
        })?;

        CandleBuilder::builder()
            .open_time(open_time)
            .open(self.open)
            .high(self.high)
            .low(self.low)
            .close(self.close)
            .volume(self.volume)
            .build()
    }
}

/// Folds raw samples into fixed-width candles.
///
/// A sample at `ts` lands in the bucket starting at `floor(ts / interval) * interval`.
/// A bucket is emitted once a sample of a later bucket arrives, or on [`finish`](Self::finish).
/// Empty buckets are never synthesized.
#[derive(Debug)]
pub struct CandleAggregator {
    interval: i64,
    current: Option<Bucket>,
}

impl CandleAggregator {
    /// Creates an aggregator producing candles `interval_sec` wide.
    pub fn new(interval_sec: u64) -> Result<Self> {
        if interval_sec == 0 {
            return Err(Error::InvalidConfig("candle interval must be positive".to_string()));
        }
        let interval = i64::try_from(interval_sec).map_err(|_| {
            Error::InvalidConfig(format!("candle interval must not exceed {} (got: {interval_sec})", i64::MAX))
        })?;

        Ok(Self { interval, current: None })
    }

    /// Bucket width in seconds.
    pub fn interval_sec(&self) -> u64 {
        self.interval as u64
    }

    /// Start of the bucket `timestamp` belongs to, `None` when it does not fit in an `i64`.
    pub fn bucket_start(&self, timestamp: i64) -> Option<i64> {
        timestamp.div_euclid(self.interval).checked_mul(self.interval)
    }

    /// Feeds one sample; returns the previous bucket when this sample closes it.
    pub fn push(&mut self, sample: Sample) -> Result<Option<Candle>> {
        let timestamp = sample.timestamp();
        if !sample.price().is_finite() || sample.price() <= 0.0 {
            return Err(Error::MalformedSample {
                timestamp,
                reason: format!("price must be positive (got: {})", sample.price()),
            });
        }
        if !sample.volume().is_finite() || sample.volume() < 0.0 {
            return Err(Error::MalformedSample {
                timestamp,
                reason: format!("volume must not be negative (got: {})", sample.volume()),
            });
        }

        let start = self.bucket_start(timestamp).ok_or_else(|| Error::MalformedSample {
            timestamp,
            reason: "timestamp out of range".to_string(),
        })?;
        match self.current.as_mut() {
            Some(bucket) if timestamp < bucket.start => Err(Error::MalformedSample {
                timestamp,
                reason: format!("before the current bucket start {}", bucket.start),
            }),
            Some(bucket) if start == bucket.start => {
                bucket.update(&sample);
                Ok(None)
            }
            _ => {
                let closed = self.current.replace(Bucket::new(start, &sample));
                closed.map(Bucket::into_candle).transpose()
            }
        }
    }

    /// Emits the bucket still open at end of input, if any.
    pub fn finish(&mut self) -> Result<Option<Candle>> {
        self.current.take().map(Bucket::into_candle).transpose()
    }

    /// Lazily aggregates `samples`, consuming this aggregator.
    pub fn aggregate<I>(self, samples: I) -> Aggregate<I::IntoIter>
    where
        I: IntoIterator<Item = Sample>,
    {
        Aggregate {
            aggregator: self,
            samples: samples.into_iter(),
            done: false,
        }
    }
}

/// Iterator returned by [`CandleAggregator::aggregate`].
///
/// Yields each closed candle; stops after the first error.
#[derive(Debug)]
pub struct Aggregate<I> {
    aggregator: CandleAggregator,
    samples: I,
    done: bool,
}

impl<I> Iterator for Aggregate<I>
where
    I: Iterator<Item = Sample>,
{
    type Item = Result<Candle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for sample in self.samples.by_ref() {
            match self.aggregator.push(sample) {
                Ok(Some(candle)) => return Some(Ok(candle)),
                Ok(None) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.done = true;
        self.aggregator.finish().transpose()
    }
}
