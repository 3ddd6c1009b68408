//! ==============================================================================
//! history.rs - bounded rolling history of ambient readings
//! ==============================================================================
//!
//! purpose:
//!     keeps the most recent (temperature, humidity) samples for trend display.
//!     the log is a ring buffer: once full, every append evicts the oldest
//!     sample, so memory stays flat no matter how long the hub runs.
//!
//! relationships:
//!     - written by: store.rs (one sample per successful ingest)
//!     - read by: store.rs (query snapshot, oldest first)
//!
//! ==============================================================================

use chrono::{DateTime, Local, Utc};
use std::collections::VecDeque;

/// 14,400 samples, about four hours at one push per second.
pub const DEFAULT_CAPACITY: usize = 14_400;

/// One retained observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,
    /// celsius, one decimal
    pub temperature: f64,
    /// relative humidity %, one decimal
    pub humidity: f64,
}

impl HistorySample {
    /// Builds a sample, rounding both readings to one decimal place.
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp,
            temperature: round1(temperature),
            humidity: round1(humidity),
        }
    }

    /// Wall-clock label shown under the chart, e.g. "03:07 PM".
    pub fn time_label(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%I:%M %p").to_string()
    }
}

/// Append-only, capacity-bounded sample log.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    samples: VecDeque<HistorySample>,
    capacity: usize,
}

impl HistoryLog {
    /// Creates an empty log. A zero capacity is bumped to 1 so that the most
    /// recent sample is always retained.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends at the tail, evicting from the head until `len <= capacity`.
    /// A timestamp older than the tail (wall clock stepped back) is clamped
    /// to the tail's so the log stays in non-decreasing time order.
    pub fn append(&mut self, mut sample: HistorySample) {
        if let Some(last) = self.samples.back() {
            sample.timestamp = sample.timestamp.max(last.timestamp);
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    /// Oldest first, copied out so the caller can release any lock.
    pub fn read_all(&self) -> Vec<HistorySample> {
        self.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

/// Round half away from zero to one decimal place. Values too large to
/// scale by 10 have no fractional digits left and pass through unchanged.
pub fn round1(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 10.0
}
