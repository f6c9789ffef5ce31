//! Parsers for the encoded string fields of the LTOS status document.

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Sentinel used by LTOS for events that have never fired.
pub const NEVER_TRIGGERED: &str = "never";

/// Format of `last-triggered` timestamps (no zone designator).
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

static MEMORY_TOTAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+kB\s+total").unwrap());

static MEMORY_FREE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+kB\s+free").unwrap());

/// Error from one of the string sub-parsers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected at least 3 load averages in {0:?}")]
    TooFewLoadFields(String),

    #[error("invalid {period}-minute load average {token:?}")]
    InvalidLoad { period: &'static str, token: String },

    #[error("no '<n> kB {which}' in {input:?}")]
    MissingMemory { which: &'static str, input: String },

    #[error("invalid timestamp {input:?}: {source}")]
    InvalidTimestamp {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("timestamp {0:?} cannot be placed in the configured offset")]
    UnmappableTimestamp(String),
}

/// Load averages over 1, 5 and 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuLoad {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

impl CpuLoad {
    /// `(period label, value)` pairs in emission order.
    pub fn by_period(&self) -> [(&'static str, f64); 3] {
        [("1", self.load1), ("5", self.load5), ("15", self.load15)]
    }
}

/// Total and free memory in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryStat {
    pub total_bytes: f64,
    pub free_bytes: f64,
}

/// Parse a `/proc/loadavg` style string: `"0.48 0.66 0.57 2/99 25157"`.
///
/// Only the first three fields are read; run-queue and last PID are ignored.
pub fn parse_cpu_load(input: &str) -> Result<CpuLoad, ParseError> {
    let fields: Vec<&str> = input.split_whitespace().collect();
    if fields.len() < 3 {
        return Err(ParseError::TooFewLoadFields(input.to_string()));
    }

    let parse = |period: &'static str, token: &str| {
        token.parse::<f64>().map_err(|_| ParseError::InvalidLoad {
            period,
            token: token.to_string(),
        })
    };

    Ok(CpuLoad {
        load1: parse("1", fields[0])?,
        load5: parse("5", fields[1])?,
        load15: parse("15", fields[2])?,
    })
}

/// Parse `"228428 kB total memory, 161732 kB free (70 %)"` into bytes.
///
/// Both the total and the free figure must be present.
pub fn parse_memory(input: &str) -> Result<MemoryStat, ParseError> {
    let total_kb = capture_kb(&MEMORY_TOTAL_REGEX, input, "total")?;
    let free_kb = capture_kb(&MEMORY_FREE_REGEX, input, "free")?;

    Ok(MemoryStat {
        total_bytes: total_kb * 1024.0,
        free_bytes: free_kb * 1024.0,
    })
}

fn capture_kb(regex: &Regex, input: &str, which: &'static str) -> Result<f64, ParseError> {
    regex
        .captures(input)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| ParseError::MissingMemory {
            which,
            input: input.to_string(),
        })
}

/// Parse an event `last-triggered` value into Unix epoch seconds.
///
/// Returns `Ok(None)` for the [`NEVER_TRIGGERED`] sentinel. The device does not
/// report a zone, so the wall-clock time is placed in `offset`.
pub fn parse_event_timestamp(input: &str, offset: FixedOffset) -> Result<Option<i64>, ParseError> {
    if input == NEVER_TRIGGERED {
        return Ok(None);
    }

    let naive = NaiveDateTime::parse_from_str(input, EVENT_TIMESTAMP_FORMAT).map_err(|source| {
        ParseError::InvalidTimestamp {
            input: input.to_string(),
            source,
        }
    })?;

    let local = offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ParseError::UnmappableTimestamp(input.to_string()))?;

    Ok(Some(local.timestamp()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_parse_cpu_load() {
        let load = parse_cpu_load("0.48 0.66 0.57 2/99 25157").unwrap();
        assert_eq!(load.load1, 0.48);
        assert_eq!(load.load5, 0.66);
        assert_eq!(load.load15, 0.57);
    }

    #[test]
    fn test_parse_cpu_load_exactly_three_fields() {
        let load = parse_cpu_load("  1.00\t2.5   0 ").unwrap();
        assert_eq!(load.by_period(), [("1", 1.0), ("5", 2.5), ("15", 0.0)]);
    }

    #[test]
    fn test_parse_cpu_load_too_few_fields() {
        assert_eq!(
            parse_cpu_load("0.48 0.66"),
            Err(ParseError::TooFewLoadFields("0.48 0.66".to_string()))
        );
        assert!(parse_cpu_load("").is_err());
    }

    #[test]
    fn test_parse_cpu_load_garbage() {
        assert!(parse_cpu_load("garbage").is_err());
        assert_eq!(
            parse_cpu_load("0.48 high 0.57 2/99 25157"),
            Err(ParseError::InvalidLoad {
                period: "5",
                token: "high".to_string()
            })
        );
    }

    #[test]
    fn test_parse_memory() {
        let mem = parse_memory("228428 kB total memory, 161732 kB free (70 %)").unwrap();
        assert_eq!(mem.total_bytes, 233_910_272.0);
        assert_eq!(mem.free_bytes, 165_613_568.0);
    }

    #[test]
    fn test_parse_memory_literal_zero() {
        let mem = parse_memory("0 kB total memory, 0 kB free (0 %)").unwrap();
        assert_eq!(mem.total_bytes, 0.0);
        assert_eq!(mem.free_bytes, 0.0);
    }

    #[test]
    fn test_parse_memory_requires_both_figures() {
        assert_eq!(
            parse_memory("228428 kB total memory"),
            Err(ParseError::MissingMemory {
                which: "free",
                input: "228428 kB total memory".to_string()
            })
        );
        assert!(matches!(
            parse_memory("161732 kB free"),
            Err(ParseError::MissingMemory { which: "total", .. })
        ));
    }

    #[test]
    fn test_parse_memory_garbage() {
        assert!(parse_memory("garbage").is_err());
    }

    #[test]
    fn test_parse_event_timestamp_never() {
        assert_eq!(parse_event_timestamp("never", utc()), Ok(None));
    }

    #[test]
    fn test_parse_event_timestamp_utc() {
        assert_eq!(
            parse_event_timestamp("2026-02-10T08:15:30", utc()),
            Ok(Some(1_770_711_330))
        );
    }

    #[test]
    fn test_parse_event_timestamp_with_offset() {
        // 08:15:30 at UTC+01:00 is 07:15:30 UTC.
        let cet = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            parse_event_timestamp("2026-02-10T08:15:30", cet),
            Ok(Some(1_770_711_330 - 3600))
        );
    }

    #[test]
    fn test_parse_event_timestamp_invalid() {
        assert!(matches!(
            parse_event_timestamp("yesterday", utc()),
            Err(ParseError::InvalidTimestamp { .. })
        ));
        assert!(parse_event_timestamp("2026-02-10 08:15:30", utc()).is_err());
        assert!(parse_event_timestamp("Never", utc()).is_err());
    }
}
