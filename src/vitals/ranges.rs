//! Clinical reference ranges.
//!
//! Static table of normal bounds for every simulated vital sign, plus the
//! out-of-range bands the generator draws from in forced-abnormal mode.

use serde::{Deserialize, Serialize};

/// Inclusive `[min, max]` bound for a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T> Range<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd + Copy> Range<T> {
    /// Both ends are inclusive.
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Side of the normal range that raises an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSide {
    /// Abnormal when the value is strictly greater than `max`
    Above,
    /// Abnormal when the value is strictly less than `min`
    Below,
}

/// One of the simulated vital signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalSign {
    HeartRate,
    Spo2,
    PulseRate,
    Temperature,
    Systolic,
    Diastolic,
}

impl VitalSign {
    /// Every vital sign, in display order.
    pub const ALL: [VitalSign; 6] = [
        VitalSign::HeartRate,
        VitalSign::Spo2,
        VitalSign::PulseRate,
        VitalSign::Temperature,
        VitalSign::Systolic,
        VitalSign::Diastolic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::Spo2 => "spo2",
            Self::PulseRate => "pulse_rate",
            Self::Temperature => "temperature",
            Self::Systolic => "bp_systolic",
            Self::Diastolic => "bp_diastolic",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Self::HeartRate | Self::PulseRate => "bpm",
            Self::Spo2 => "%",
            Self::Temperature => "°C",
            Self::Systolic | Self::Diastolic => "mmHg",
        }
    }

    /// SpO₂ alarms on the low side, everything else on the high side.
    pub fn alarm_side(&self) -> AlarmSide {
        match self {
            Self::Spo2 => AlarmSide::Below,
            _ => AlarmSide::Above,
        }
    }
}

/// Blood pressure bounds, nested the same way as the reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureRanges {
    pub systolic: Range<u32>,
    pub diastolic: Range<u32>,
}

/// Normal bounds for every parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalRanges {
    pub heart_rate: Range<u32>,
    pub spo2: Range<u32>,
    pub pulse_rate: Range<u32>,
    pub temperature: Range<f64>,
    pub blood_pressure: BloodPressureRanges,
}

impl ClinicalRanges {
    /// Bounds of `sign` widened to `f64`.
    pub fn bounds(&self, sign: VitalSign) -> Range<f64> {
        let widen = |r: Range<u32>| Range::new(f64::from(r.min), f64::from(r.max));
        match sign {
            VitalSign::HeartRate => widen(self.heart_rate),
            VitalSign::Spo2 => widen(self.spo2),
            VitalSign::PulseRate => widen(self.pulse_rate),
            VitalSign::Temperature => self.temperature,
            VitalSign::Systolic => widen(self.blood_pressure.systolic),
            VitalSign::Diastolic => widen(self.blood_pressure.diastolic),
        }
    }

    /// The limit a value must cross on the alarm side to be abnormal.
    pub fn alarm_limit(&self, sign: VitalSign) -> f64 {
        let bounds = self.bounds(sign);
        match sign.alarm_side() {
            AlarmSide::Above => bounds.max,
            AlarmSide::Below => bounds.min,
        }
    }
}

/// Normal reference ranges.
pub const NORMAL_RANGES: ClinicalRanges = ClinicalRanges {
    heart_rate: Range::new(60, 100),
    spo2: Range::new(95, 100),
    pulse_rate: Range::new(60, 100),
    temperature: Range::new(36.5, 37.5),
    blood_pressure: BloodPressureRanges {
        systolic: Range::new(90, 120),
        diastolic: Range::new(60, 80),
    },
};

/// Half-open bands used for forced-abnormal generation.
///
/// Each band sits strictly on the alarm side of the matching normal range.
#[derive(Debug, Clone, PartialEq)]
pub struct AbnormalBands {
    pub heart_rate: std::ops::Range<u32>,
    pub spo2: std::ops::Range<u32>,
    pub pulse_rate: std::ops::Range<u32>,
    pub temperature: std::ops::Range<f64>,
    pub systolic: std::ops::Range<u32>,
    pub diastolic: std::ops::Range<u32>,
}

pub const ABNORMAL_BANDS: AbnormalBands = AbnormalBands {
    heart_rate: 110..140,
    spo2: 85..90,
    pulse_rate: 110..140,
    temperature: 38.5..40.5,
    systolic: 140..170,
    diastolic: 90..110,
};
