//! latest-known reading per field.
//!
//! the snapshot is a pass-through cache: no range checks, last write wins per
//! field. fields missing from a patch keep whatever value they had.

use crate::domain::TelemetryPatch;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotState {
    /// ambient temperature (sht20), celsius. `None` until first received
    /// when the hub starts unseeded.
    pub temperature: Option<f64>,
    /// ambient relative humidity (sht20), percent
    pub humidity: Option<f64>,
    /// esp32 die temperature, celsius
    pub cpu_temperature: f64,
    /// lm75 board temperature, celsius
    pub board_temperature: f64,
    /// free heap, pre-formatted e.g. "12.34KB"
    pub memory_use_label: String,
    pub cpu_usage_percent: f64,
    pub wifi_signal_dbm: i64,
}

impl Default for SnapshotState {
    fn default() -> Self {
        Self {
            temperature: Some(23.5),
            humidity: Some(45.2),
            cpu_temperature: 40.0,
            board_temperature: 0.0,
            memory_use_label: "0KB".to_string(),
            cpu_usage_percent: 0.0,
            wifi_signal_dbm: 0,
        }
    }
}

impl SnapshotState {
    /// Defaults without ambient readings; history stays empty until the
    /// device reports both temperature and humidity.
    pub fn unseeded() -> Self {
        Self {
            temperature: None,
            humidity: None,
            ..Self::default()
        }
    }

    pub fn merge(&mut self, patch: &TelemetryPatch) {
        if let Some(v) = patch.board_temperature {
            self.board_temperature = v;
        }
        if let Some(v) = patch.temperature {
            self.temperature = Some(v);
        }
        if let Some(v) = patch.humidity {
            self.humidity = Some(v);
        }
        if let Some(v) = patch.cpu_temperature {
            self.cpu_temperature = v;
        }
        if let Some(bytes) = patch.free_memory_bytes {
            self.memory_use_label = memory_label(bytes);
        }
        if let Some(v) = patch.cpu_usage_percent {
            self.cpu_usage_percent = v;
        }
        if let Some(v) = patch.wifi_signal_dbm {
            self.wifi_signal_dbm = v;
        }
    }

    /// Both ambient readings, if the snapshot holds finite values for them.
    pub fn ambient(&self) -> Option<(f64, f64)> {
        match (self.temperature, self.humidity) {
            (Some(t), Some(h)) if t.is_finite() && h.is_finite() => Some((t, h)),
            _ => None,
        }
    }
}

/// Free-heap byte count as kilobytes with two decimals.
pub fn memory_label(bytes: f64) -> String {
    format!("{:.2}KB", bytes / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_left_alone() {
        let mut snap = SnapshotState::default();
        snap.merge(&TelemetryPatch {
            cpu_temperature: Some(51.5),
            ..TelemetryPatch::default()
        });

        assert_eq!(snap.cpu_temperature, 51.5);
        assert_eq!(snap.temperature, Some(23.5));
        assert_eq!(snap.humidity, Some(45.2));
        assert_eq!(snap.memory_use_label, "0KB");
    }

    #[test]
    fn last_write_wins_per_field() {
        let mut snap = SnapshotState::default();
        snap.merge(&TelemetryPatch {
            temperature: Some(20.0),
            wifi_signal_dbm: Some(-70),
            ..TelemetryPatch::default()
        });
        snap.merge(&TelemetryPatch {
            temperature: Some(22.0),
            board_temperature: Some(30.25),
            ..TelemetryPatch::default()
        });

        assert_eq!(snap.temperature, Some(22.0));
        assert_eq!(snap.board_temperature, 30.25);
        assert_eq!(snap.wifi_signal_dbm, -70);
    }

    #[test]
    fn free_memory_becomes_kilobyte_label() {
        let mut snap = SnapshotState::unseeded();
        snap.merge(&TelemetryPatch {
            free_memory_bytes: Some(204_800.0),
            ..TelemetryPatch::default()
        });

        assert_eq!(snap.memory_use_label, "200.00KB");
        assert_eq!(memory_label(12_636.0), "12.34KB");
    }

    #[test]
    fn ambient_needs_both_readings() {
        let mut snap = SnapshotState::unseeded();
        assert_eq!(snap.ambient(), None);

        snap.merge(&TelemetryPatch { temperature: Some(19.0), ..TelemetryPatch::default() });
        assert_eq!(snap.ambient(), None);

        snap.merge(&TelemetryPatch { humidity: Some(60.0), ..TelemetryPatch::default() });
        assert_eq!(snap.ambient(), Some((19.0, 60.0)));
    }
}
