//! Threshold evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ranges::{AlarmSide, VitalSign, NORMAL_RANGES};
use super::reading::Reading;

/// A parameter that crossed its alarm limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub sign: VitalSign,
    pub value: f64,
    pub limit: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.sign.alarm_side() {
            AlarmSide::Above => '>',
            AlarmSide::Below => '<',
        };
        write!(
            f,
            "{} {}{} {} {}",
            self.sign.name(),
            self.value,
            self.sign.unit(),
            op,
            self.limit
        )
    }
}

/// True if any parameter lies beyond its alarm limit.
///
/// Upper-bound parameters are abnormal only when strictly greater than
/// `max`; SpO₂ only when strictly less than `min`. Exact bounds are normal.
pub fn is_abnormal(reading: &Reading) -> bool {
    let ranges = &NORMAL_RANGES;
    let bp = reading.blood_pressure();
    reading.heart_rate() > ranges.heart_rate.max
        || reading.spo2() < ranges.spo2.min
        || reading.pulse_rate() > ranges.pulse_rate.max
        || reading.temperature() > ranges.temperature.max
        || bp.systolic > ranges.blood_pressure.systolic.max
        || bp.diastolic > ranges.blood_pressure.diastolic.max
}

/// Every parameter of `reading` beyond its alarm limit, in display order.
pub fn violations(reading: &Reading) -> Vec<Violation> {
    VitalSign::ALL
        .iter()
        .filter_map(|&sign| {
            let value = reading.value(sign);
            let limit = NORMAL_RANGES.alarm_limit(sign);
            let crossed = match sign.alarm_side() {
                AlarmSide::Above => value > limit,
                AlarmSide::Below => value < limit,
            };
            crossed.then_some(Violation { sign, value, limit })
        })
        .collect()
}
