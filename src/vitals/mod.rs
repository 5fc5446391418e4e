//! Vital-sign domain: reference ranges, readings, generation and evaluation.
//!
//! Everything in this module is pure given an injected random source; the
//! side-effecting parts (publishing, persisting, alerting) live in
//! [`crate::monitoring`].

pub mod evaluator;
pub mod generator;
pub mod ranges;
pub mod reading;

pub use evaluator::{is_abnormal, violations, Violation};
pub use generator::{generate_reading, ReadingGenerator, ABNORMAL_TICK_PROBABILITY};
pub use ranges::{AlarmSide, ClinicalRanges, Range, VitalSign, ABNORMAL_BANDS, NORMAL_RANGES};
pub use reading::{BloodPressure, Reading};
