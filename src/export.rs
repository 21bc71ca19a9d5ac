//! Files in and out of a backtest.
//!
//! Writes go to a hidden sibling file first and are renamed over the destination once flushed,
//! so a failed write never leaves a truncated result behind.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::engine::{Candle, CandleBuilder, EquityPoint};
use crate::errors::{Error, Result};
use crate::metrics::Summary;

/// Columns of the equity curve CSV, in the order [`EquityPoint`] serializes its fields.
pub const EQUITY_CSV_COLUMNS: [&str; 4] = ["timestamp", "equity", "realized_pnl", "unrealized_pnl"];

/// One candle as stored on disk; `open_time` in epoch seconds.
#[derive(Debug, Clone, Deserialize)]
struct CandleRow {
    #[serde(with = "chrono::serde::ts_seconds")]
    open_time: DateTime<Utc>,
    #[serde(alias = "open_price")]
    open: f64,
    #[serde(alias = "high_price")]
    high: f64,
    #[serde(alias = "low_price")]
    low: f64,
    #[serde(alias = "close_price")]
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl TryFrom<CandleRow> for Candle {
    type Error = Error;

    fn try_from(row: CandleRow) -> Result<Self> {
        CandleBuilder::builder()
            .open_time(row.open_time)
            .open(row.open)
            .high(row.high)
            .low(row.low)
            .close(row.close)
            .volume(row.volume)
            .build()
    }
}

/// Reads a JSON array of candles from `path`.
///
/// Every row goes through [`CandleBuilder`], so an invalid row fails the whole load.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let rows: Vec<CandleRow> = serde_json::from_reader(reader)?;
    rows.into_iter().map(Candle::try_from).collect()
}

/// Writes the equity curve as CSV, one row per point, `timestamp` in epoch seconds.
///
/// The header is written even for an empty curve.
pub fn write_equity_csv(path: impl AsRef<Path>, curve: &[EquityPoint]) -> Result<()> {
    write_atomically(path.as_ref(), |writer| {
        let mut rows = csv::WriterBuilder::new().has_headers(false).from_writer(&mut *writer);
        rows.write_record(EQUITY_CSV_COLUMNS)?;
        for point in curve {
            rows.serialize(point)?;
        }
        rows.flush()?;
        Ok(())
    })
}

/// Writes the summary as pretty-printed JSON.
pub fn write_summary_json(path: impl AsRef<Path>, summary: &Summary) -> Result<()> {
    write_atomically(path.as_ref(), |writer| {
        serde_json::to_writer_pretty(&mut *writer, summary)?;
        writeln!(writer)?;
        Ok(())
    })
}

fn temp_path(path: &Path) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", path.display()),
        ))
    })?;
    Ok(path.with_file_name(format!(".{}.tmp", name.to_string_lossy())))
}

fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = temp_path(path)?;

    let written = File::create(&tmp).map_err(Error::from).and_then(|file| {
        let mut writer = BufWriter::new(file);
        write(&mut writer)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    });

    match written {
        Ok(()) => fs::rename(&tmp, path).map_err(Error::from),
        Err(e) => {
            // keep the write error, not the cleanup one
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
