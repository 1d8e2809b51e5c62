use crate::config::FormatConfig;
use chrono::DateTime;
use serde::Serialize;

const MICROS_PER_MILLI: i64 = 1_000;
const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_MINUTE: i64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeUnit {
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    pub fn micros(self) -> i64 {
        match self {
            TimeUnit::Hours => MICROS_PER_HOUR,
            TimeUnit::Minutes => MICROS_PER_MINUTE,
            TimeUnit::Seconds => MICROS_PER_SECOND,
            TimeUnit::Milliseconds => MICROS_PER_MILLI,
            TimeUnit::Microseconds => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Hours => "h",
            TimeUnit::Minutes => "min",
            TimeUnit::Seconds => "s",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Microseconds => "μs",
        }
    }

    /// Largest unit in which `max_micros` exceeds `threshold` whole units
    pub fn for_max(max_micros: i64, threshold: u32) -> Self {
        let threshold = i64::from(threshold);
        [
            TimeUnit::Hours,
            TimeUnit::Minutes,
            TimeUnit::Seconds,
            TimeUnit::Milliseconds,
        ]
        .into_iter()
        .find(|unit| max_micros > threshold * unit.micros())
        .unwrap_or(TimeUnit::Microseconds)
    }
}

/// Formats every duration of one waterfall in the same unit.
///
/// Built per waterfall from its longest duration and the caller's
/// configuration; nothing is cached between waterfalls.
#[derive(Debug, Clone, Copy)]
pub struct DurationFormatter {
    unit: TimeUnit,
    precision: usize,
}

impl DurationFormatter {
    pub fn new(max_micros: i64, config: &FormatConfig) -> Self {
        Self {
            unit: TimeUnit::for_max(max_micros, config.duration_threshold),
            precision: config.precision,
        }
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn value(&self, micros: i64) -> f64 {
        micros as f64 / self.unit.micros() as f64
    }

    pub fn format(&self, micros: i64) -> String {
        let precision = if self.unit == TimeUnit::Microseconds {
            0
        } else {
            self.precision
        };
        format!("{:.*} {}", precision, self.value(micros), self.unit.label())
    }
}

/// Absolute UTC timestamp for a microsecond epoch value
pub fn format_timestamp(micros: i64) -> String {
    match DateTime::from_timestamp_micros(micros) {
        Some(date_time) => date_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => micros.to_string(),
    }
}
