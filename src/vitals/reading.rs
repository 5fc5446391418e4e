//! Vital-sign snapshot types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ranges::VitalSign;

/// Systolic/diastolic pair in mmHg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

impl BloodPressure {
    pub fn new(systolic: u32, diastolic: u32) -> Self {
        Self {
            systolic,
            diastolic,
        }
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// One vital-sign snapshot.
///
/// Fields are private: a reading is never mutated after it is produced, it
/// is only moved or cloned into the history log and alert records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredReading")]
pub struct Reading {
    heart_rate: u32,
    spo2: u32,
    pulse_rate: u32,
    temperature: f64,
    blood_pressure: BloodPressure,
    timestamp: DateTime<Utc>,
}

/// On-disk shape of a history record, current or legacy.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredReading {
    heart_rate: u32,
    spo2: u32,
    pulse_rate: u32,
    temperature: f64,
    #[serde(alias = "bp")]
    blood_pressure: StoredBloodPressure,
    timestamp: Option<DateTime<Utc>>,
}

// Legacy records carry the time inside `bp` and have no top-level timestamp.
#[derive(Deserialize)]
struct StoredBloodPressure {
    systolic: u32,
    diastolic: u32,
    timestamp: Option<DateTime<Utc>>,
}

impl From<StoredReading> for Reading {
    fn from(stored: StoredReading) -> Self {
        let bp = stored.blood_pressure;
        Self {
            heart_rate: stored.heart_rate,
            spo2: stored.spo2,
            pulse_rate: stored.pulse_rate,
            temperature: stored.temperature,
            blood_pressure: BloodPressure::new(bp.systolic, bp.diastolic),
            timestamp: stored
                .timestamp
                .or(bp.timestamp)
                .unwrap_or_else(Utc::now),
        }
    }
}

impl Reading {
    /// Build a reading stamped with the current time.
    pub fn new(
        heart_rate: u32,
        spo2: u32,
        pulse_rate: u32,
        temperature: f64,
        blood_pressure: BloodPressure,
    ) -> Self {
        Self {
            heart_rate,
            spo2,
            pulse_rate,
            temperature,
            blood_pressure,
            timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn heart_rate(&self) -> u32 {
        self.heart_rate
    }

    pub fn spo2(&self) -> u32 {
        self.spo2
    }

    pub fn pulse_rate(&self) -> u32 {
        self.pulse_rate
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn blood_pressure(&self) -> BloodPressure {
        self.blood_pressure
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Value of a single parameter widened to `f64`.
    pub fn value(&self, sign: VitalSign) -> f64 {
        match sign {
            VitalSign::HeartRate => f64::from(self.heart_rate),
            VitalSign::Spo2 => f64::from(self.spo2),
            VitalSign::PulseRate => f64::from(self.pulse_rate),
            VitalSign::Temperature => self.temperature,
            VitalSign::Systolic => f64::from(self.blood_pressure.systolic),
            VitalSign::Diastolic => f64::from(self.blood_pressure.diastolic),
        }
    }

    /// Single-line summary shown in the history view.
    pub fn summary(&self) -> String {
        format!(
            "SpO₂: {}% | Pulse: {} bpm | Temp: {:.1}°C | BP: {} mmHg",
            self.spo2, self.pulse_rate, self.temperature, self.blood_pressure
        )
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HR: {} bpm | {}", self.heart_rate, self.summary())
    }
}
