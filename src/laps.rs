//! Lap counting and run scoring, computed from published snapshots.
//!
//! The track is a closed loop of `track_length` metres measured along the
//! path the car has driven. A lap completes each time the travelled distance
//! passes another multiple of the track length, provided the lap took longer
//! than [`MIN_LAP_TIME`].

use serde::Serialize;

use crate::vehicle::types::VehicleState;

/// Laps shorter than this (s) are not counted.
pub const MIN_LAP_TIME: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LapEvent {
    pub lap: u32,
    pub lap_time: f64,
    pub best: bool,
}

/// Terminal result handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub vehicle: String,
    pub laps: u32,
    pub best_lap: Option<f64>,
    pub total_time: f64,
    pub distance: f32,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct LapTracker {
    track_length: f32,
    laps: u32,
    markers_passed: u32,
    lap_start: f64,
    best_lap: Option<f64>,
    last_time: f64,
    last_distance: f32,
    score: f64,
}

impl LapTracker {
    pub fn new(track_length: f32) -> Self {
        Self {
            track_length: track_length.max(1.0),
            laps: 0,
            markers_passed: 0,
            lap_start: 0.0,
            best_lap: None,
            last_time: 0.0,
            last_distance: 0.0,
            score: 0.0,
        }
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }

    pub fn best_lap(&self) -> Option<f64> {
        self.best_lap
    }

    /// Time into the current lap as of the last update (s).
    pub fn current_lap_time(&self) -> f64 {
        self.last_time - self.lap_start
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    /// Feeds the latest snapshot. Returns an event when a lap completes.
    pub fn update(&mut self, state: &VehicleState) -> Option<LapEvent> {
        let distance = state.telemetry.distance;

        // score: distance covered weighted by the speed it was covered at
        let travelled = (distance - self.last_distance).max(0.0) as f64;
        self.score += travelled * state.chassis.speed() as f64;
        self.last_distance = distance;
        self.last_time = state.time;

        let markers = (distance / self.track_length).floor() as u32;
        if markers <= self.markers_passed {
            return None;
        }
        self.markers_passed = markers;

        let lap_time = state.time - self.lap_start;
        if lap_time <= MIN_LAP_TIME {
            return None;
        }

        self.laps += 1;
        self.lap_start = state.time;
        let best = self.best_lap.is_none_or(|b| lap_time < b);
        if best {
            self.best_lap = Some(lap_time);
        }

        Some(LapEvent { lap: self.laps, lap_time, best })
    }

    pub fn result(&self, vehicle: &str) -> RunResult {
        RunResult {
            vehicle: vehicle.to_string(),
            laps: self.laps,
            best_lap: self.best_lap,
            total_time: self.last_time,
            distance: self.last_distance,
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::params::ParameterSet;
    use crate::context::SimulationContext;

    fn at(time: f64, distance: f32) -> VehicleState {
        let mut s = SimulationContext::new(ParameterSet::gt86()).unwrap().state();
        s.time = time;
        s.telemetry.distance = distance;
        s
    }

    #[test]
    fn test_counts_lap_on_each_track_length() {
        let mut laps = LapTracker::new(100.0);
        assert_eq!(laps.update(&at(5.0, 99.0)), None);

        let ev = laps.update(&at(6.0, 101.0)).unwrap();
        assert_eq!(ev, LapEvent { lap: 1, lap_time: 6.0, best: true });

        let ev = laps.update(&at(10.0, 205.0)).unwrap();
        assert_eq!(ev.lap, 2);
        assert!((ev.lap_time - 4.0).abs() < 1e-9);
        assert!(ev.best);

        let ev = laps.update(&at(20.0, 301.0)).unwrap();
        assert!(!ev.best);
        assert_eq!(laps.best_lap(), Some(4.0));
    }

    #[test]
    fn test_short_lap_is_ignored() {
        let mut laps = LapTracker::new(10.0);
        assert_eq!(laps.update(&at(1.0, 12.0)), None);
        assert_eq!(laps.laps(), 0);
        // the ignored crossing does not count later either
        assert_eq!(laps.update(&at(3.0, 15.0)), None);
        assert!(laps.update(&at(3.5, 21.0)).is_some());
    }

    #[test]
    fn test_result_reports_totals() {
        let mut laps = LapTracker::new(50.0);
        laps.update(&at(4.0, 40.0));
        laps.update(&at(8.0, 60.0));
        let r = laps.result("gt86");

        assert_eq!(r.vehicle, "gt86");
        assert_eq!(r.laps, 1);
        assert_eq!(r.total_time, 8.0);
        assert_eq!(r.distance, 60.0);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["best_lap"], 8.0);
    }
}
