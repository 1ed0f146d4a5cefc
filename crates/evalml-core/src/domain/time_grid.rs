//! Initialization-time axis of an experiment.
//!
//! A [`TimeGridSpec`] is either an explicit list of timestamps (used
//! verbatim, duplicates included) or a `{start, end, frequency}` range that
//! is expanded inclusively on both ends.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{EvalError, Result};

/// Path-segment format of an init time, e.g. `202401010600`.
pub const INIT_TIME_FORMAT: &str = "%Y%m%d%H%M";

/// ISO-8601 rendering handed to inference configs.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A forecast initialization time (UTC, minute resolution).
///
/// Seconds and sub-seconds are dropped on construction so that two values
/// rendering to the same `YYYYMMDDHHMM` path segment compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InitTime(NaiveDateTime);

impl InitTime {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self(
            datetime
                .with_second(0)
                .and_then(|dt| dt.with_nanosecond(0))
                .unwrap_or(datetime),
        )
    }

    /// Parse an ISO-8601-like timestamp or a compact `YYYYMMDDHHMM` string.
    ///
    /// Offsets are converted to UTC. A bare date means midnight.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();

        if let Some(compact) = parse_compact(s) {
            return Ok(Self::new(compact));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::new(dt.naive_utc()));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self::new(dt));
            }
        }
        if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Self::new(midnight));
        }

        Err(EvalError::Configuration(format!(
            "invalid timestamp `{input}`: expected ISO-8601 (e.g. 2024-01-01T00:00) or YYYYMMDDHHMM"
        )))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// `YYYY-MM-DDTHH:MM`, the form inference tooling expects for `date=`.
    pub fn to_iso(&self) -> String {
        self.0.format(ISO_FORMAT).to_string()
    }

    fn checked_add(&self, step: Duration) -> Option<Self> {
        self.0.checked_add_signed(step).map(Self)
    }
}

fn parse_compact(s: &str) -> Option<NaiveDateTime> {
    if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = s[0..4].parse().ok()?;
    let month = s[4..6].parse().ok()?;
    let day = s[6..8].parse().ok()?;
    let hour = s[8..10].parse().ok()?;
    let minute = s[10..12].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

impl fmt::Display for InitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(INIT_TIME_FORMAT))
    }
}

impl FromStr for InitTime {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InitTime {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<InitTime> for String {
    fn from(value: InitTime) -> Self {
        value.to_string()
    }
}

/// Unit of a launch [`Frequency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrequencyUnit {
    Hours,
    Days,
}

/// Spacing between consecutive initializations, e.g. `6h` or `1d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frequency {
    magnitude: u32,
    unit: FrequencyUnit,
}

fn frequency_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d+)([A-Za-z]+)$").ok())
        .as_ref()
}

impl Frequency {
    pub fn magnitude(&self) -> u32 {
        self.magnitude
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    pub fn as_duration(&self) -> Duration {
        match self.unit {
            FrequencyUnit::Hours => Duration::hours(i64::from(self.magnitude)),
            FrequencyUnit::Days => Duration::days(i64::from(self.magnitude)),
        }
    }
}

impl FromStr for Frequency {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = frequency_pattern()
            .and_then(|re| re.captures(s.trim()))
            .ok_or_else(|| {
                EvalError::Configuration(format!(
                    "invalid frequency `{s}`: expected <integer><unit> with unit `d` or `h`"
                ))
            })?;

        let unit = match &caps[2] {
            "h" => FrequencyUnit::Hours,
            "d" => FrequencyUnit::Days,
            other => {
                return Err(EvalError::Configuration(format!(
                    "invalid frequency `{s}`: unsupported unit `{other}` (only `d` and `h`)"
                )))
            }
        };
        let magnitude: u32 = caps[1].parse().map_err(|_| {
            EvalError::Configuration(format!("invalid frequency `{s}`: magnitude out of range"))
        })?;
        if magnitude == 0 {
            return Err(EvalError::Configuration(format!(
                "invalid frequency `{s}`: magnitude must be a positive integer"
            )));
        }

        Ok(Self { magnitude, unit })
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            FrequencyUnit::Hours => "h",
            FrequencyUnit::Days => "d",
        };
        write!(f, "{}{}", self.magnitude, unit)
    }
}

/// Forecast length, e.g. `120h`, `90m` or `5d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeadTime {
    minutes: i64,
}

fn lead_time_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d+)([hmd])$").ok()).as_ref()
}

impl LeadTime {
    pub fn as_duration(&self) -> Duration {
        Duration::minutes(self.minutes)
    }

    /// Whole hours, or `None` when the lead time is not hour-aligned.
    pub fn whole_hours(&self) -> Option<i64> {
        (self.minutes % 60 == 0).then_some(self.minutes / 60)
    }
}

impl FromStr for LeadTime {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = lead_time_pattern()
            .and_then(|re| re.captures(s.trim()))
            .ok_or_else(|| {
                EvalError::Configuration(format!(
                    "invalid lead time `{s}`: expected <integer><unit> with unit `h`, `m` or `d`"
                ))
            })?;
        let magnitude: i64 = caps[1].parse().map_err(|_| {
            EvalError::Configuration(format!("invalid lead time `{s}`: magnitude out of range"))
        })?;
        let per_unit = match &caps[2] {
            "m" => 1,
            "h" => 60,
            _ => 24 * 60,
        };
        let minutes = magnitude.checked_mul(per_unit).ok_or_else(|| {
            EvalError::Configuration(format!("invalid lead time `{s}`: magnitude out of range"))
        })?;
        Ok(Self { minutes })
    }
}

/// Declarative init-time axis as written in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeGridSpec {
    /// Manually curated timestamps; order and duplicates are kept.
    Explicit(Vec<String>),
    Range {
        start: String,
        end: String,
        frequency: String,
    },
}

/// Expand `grid` into its ordered sequence of init times.
pub fn generate(grid: &TimeGridSpec) -> Result<Vec<InitTime>> {
    match grid {
        TimeGridSpec::Explicit(entries) => entries.iter().map(|s| InitTime::parse(s)).collect(),
        TimeGridSpec::Range {
            start,
            end,
            frequency,
        } => {
            let start = InitTime::parse(start)?;
            let end = InitTime::parse(end)?;
            let step = frequency.parse::<Frequency>()?.as_duration();

            let mut times = Vec::new();
            let mut current = Some(start);
            while let Some(t) = current.filter(|t| *t <= end) {
                times.push(t);
                current = t.checked_add(step);
            }
            Ok(times)
        }
    }
}
