//! threshold alerts derived from the ambient temperature.
//!
//! recomputed on every query and never stored.

use serde::Serialize;

/// Above this (strictly) the hub raises a warning.
pub const HIGH_TEMPERATURE: f64 = 26.0;
/// Below this (strictly) the hub raises an info notice.
pub const LOW_TEMPERATURE: f64 = 21.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: &'static str,
}

pub fn evaluate(temperature: Option<f64>) -> Option<Alert> {
    let t = temperature?;
    if t > HIGH_TEMPERATURE {
        Some(Alert { kind: AlertKind::Warning, message: "High temperature detected!" })
    } else if t < LOW_TEMPERATURE {
        Some(Alert { kind: AlertKind::Info, message: "Temperature is a bit low." })
    } else {
        None
    }
}
