//! Daily activity simulation and day/night display mode.
//!
//! Both feed the dashboard only; neither takes part in threshold evaluation
//! or alerting.

use chrono::{DateTime, Local, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How often the binary advances the activity tracker.
pub const ACTIVITY_UPDATE_INTERVAL: Duration = Duration::from_secs(3);

/// Night runs from 20:00 until 06:00.
const NIGHT_START_HOUR: u32 = 20;
const NIGHT_END_HOUR: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DisplayMode {
    Day,
    Night,
}

impl DisplayMode {
    /// Mode for an hour of the day (0-23).
    pub fn at(hour: u32) -> Self {
        if hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR {
            Self::Night
        } else {
            Self::Day
        }
    }

    pub fn for_time<Tz: chrono::TimeZone>(time: &DateTime<Tz>) -> Self {
        Self::at(time.hour())
    }

    pub fn now() -> Self {
        Self::for_time(&Local::now())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "Day Mode (6AM - 8PM)",
            Self::Night => "Night Mode (8PM - 6AM)",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day => write!(f, "DAY"),
            Self::Night => write!(f, "NIGHT"),
        }
    }
}

/// Snapshot of the simulated activity counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivitySnapshot {
    pub steps: u64,
    pub heartbeat: u32,
}

impl ActivitySnapshot {
    /// Narrative summary of the current activity level.
    pub fn story(&self) -> String {
        let activity = match self.heartbeat {
            hb if hb < 60 => "Elder is resting peacefully.",
            hb if hb <= 90 => "Elder is having light to moderate activity.",
            _ => "Elder seems to be highly active or stressed.",
        };
        let movement = match self.steps {
            s if s < 1000 => "Movement is minimal today.",
            s if s <= 5000 => "Elder has been walking moderately.",
            _ => "Elder has had a very active day.",
        };
        format!(
            "{} {} Current stats: Steps: {}, Heartbeat: {} bpm.",
            activity, movement, self.steps, self.heartbeat
        )
    }
}

impl fmt::Display for ActivitySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Steps: {} | Heartbeat: {} bpm", self.steps, self.heartbeat)
    }
}

#[derive(Debug)]
pub struct ActivityTracker {
    rng: StdRng,
    current: ActivitySnapshot,
}

impl ActivityTracker {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            current: ActivitySnapshot {
                steps: 0,
                heartbeat: 70,
            },
        }
    }

    /// Advance one update: 0-9 more steps and a fresh heartbeat in [55, 105).
    pub fn step(&mut self) -> ActivitySnapshot {
        self.current.steps += self.rng.gen_range(0..10u64);
        self.current.heartbeat = self.rng.gen_range(55..105);
        self.current
    }

    pub fn current(&self) -> ActivitySnapshot {
        self.current
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_display_mode_boundaries() {
        assert_eq!(DisplayMode::at(5), DisplayMode::Night);
        assert_eq!(DisplayMode::at(6), DisplayMode::Day);
        assert_eq!(DisplayMode::at(19), DisplayMode::Day);
        assert_eq!(DisplayMode::at(20), DisplayMode::Night);
        assert_eq!(DisplayMode::at(0), DisplayMode::Night);

        let evening = Utc.with_ymd_and_hms(2025, 3, 1, 21, 15, 0).unwrap();
        assert_eq!(DisplayMode::for_time(&evening), DisplayMode::Night);
    }

    #[test]
    fn test_tracker_step_bounds() {
        let mut tracker = ActivityTracker::seeded(11);
        let mut previous = tracker.current().steps;
        for _ in 0..500 {
            let snapshot = tracker.step();
            assert!(snapshot.steps - previous <= 9);
            assert!((55..105).contains(&snapshot.heartbeat));
            previous = snapshot.steps;
        }
    }

    #[test]
    fn test_story_thresholds() {
        let story = ActivitySnapshot { steps: 999, heartbeat: 59 }.story();
        assert!(story.starts_with("Elder is resting peacefully. Movement is minimal today."));

        let story = ActivitySnapshot { steps: 5000, heartbeat: 90 }.story();
        assert!(story.contains("light to moderate"));
        assert!(story.contains("walking moderately"));

        let story = ActivitySnapshot { steps: 5001, heartbeat: 91 }.story();
        assert!(story.contains("highly active"));
        assert!(story.contains("very active day"));
        assert!(story.ends_with("Steps: 5001, Heartbeat: 91 bpm."));
    }

    #[test]
    fn test_seeded_trackers_agree() {
        let mut a = ActivityTracker::seeded(4);
        let mut b = ActivityTracker::seeded(4);
        for _ in 0..10 {
            assert_eq!(a.step(), b.step());
        }
    }
}
