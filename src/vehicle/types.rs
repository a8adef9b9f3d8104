//! Core shared types for the vehicle model (engine-agnostic).
// vehicle/types.rs
use std::fmt;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

pub type Vec2 = Vector2<f32>;

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    /// Storage order for every per-corner array in the crate.
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn index(&self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    /// Lowercase key used by the flat parameter mapping.
    pub fn key(&self) -> &'static str {
        match self {
            WheelId::FL => "fl",
            WheelId::FR => "fr",
            WheelId::RL => "rl",
            WheelId::RR => "rr",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================
// ----- driver input -------------------------
// ============================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftRequest {
    #[default]
    None,
    Up,
    Down,
}

/// One control sample. Values outside their documented range are clamped by
/// [`ControlInput::clamped`], never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    pub throttle: f32,  // 0..1
    pub brake: f32,     // 0..1
    pub steer: f32,     // -1 (full right) .. 1 (full left)
    #[serde(default)]
    pub shift: ShiftRequest,
}

#[inline]
fn clamp_axis(v: f32, lo: f32, hi: f32) -> f32 {
    // NaN from a flaky device reads as "released"
    if v.is_nan() { 0.0 } else { v.clamp(lo, hi) }
}

impl ControlInput {
    pub fn new(throttle: f32, brake: f32, steer: f32) -> Self {
        Self { throttle, brake, steer, shift: ShiftRequest::None }
    }

    pub fn clamped(&self) -> Self {
        Self {
            throttle: clamp_axis(self.throttle, 0.0, 1.0),
            brake: clamp_axis(self.brake, 0.0, 1.0),
            steer: clamp_axis(self.steer, -1.0, 1.0),
            shift: self.shift,
        }
    }
}

// ============================================
// ----- per-component state ------------------
// ============================================

/// Mutated only by the powertrain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub rpm: f32,      // always within [idle, redline]
    pub gear: usize,   // index into ParameterSet::gear_ratios
    pub clutch: f32,   // 0 (fully slipping) .. 1 (locked)
}

impl EngineState {
    pub fn idle(idle_rpm: f32) -> Self {
        Self { rpm: idle_rpm, gear: 0, clutch: 0.0 }
    }
}

/// Mutated only by the suspension model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerState {
    pub compression: f32,           // m, positive = compressed
    pub compression_velocity: f32,  // m/s
    pub normal_load: f32,           // N, never negative
}

/// Planar rigid chassis. Mutated only by chassis dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisState {
    pub position: Vec2,    // m, world plane
    pub heading: f32,      // rad, 0 = +X, counter-clockwise positive
    pub velocity: Vec2,    // m/s, world frame
    pub yaw_rate: f32,     // rad/s

    /// Acceleration of the previous tick in the body frame
    /// (x = longitudinal, y = lateral/left). Read by the suspension one tick
    /// late so suspension and chassis never need a simultaneous solve.
    pub prev_accel: Vec2,
}

impl Default for ChassisState {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            heading: 0.0,
            velocity: Vec2::zeros(),
            yaw_rate: 0.0,
            prev_accel: Vec2::zeros(),
        }
    }
}

impl ChassisState {
    #[inline]
    pub fn forward(&self) -> Vec2 {
        Vec2::new(self.heading.cos(), self.heading.sin())
    }

    #[inline]
    pub fn left(&self) -> Vec2 {
        Vec2::new(-self.heading.sin(), self.heading.cos())
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    /// (v_long, v_lat) in the body frame.
    #[inline]
    pub fn local_velocity(&self) -> (f32, f32) {
        (self.velocity.dot(&self.forward()), self.velocity.dot(&self.left()))
    }
}

/// Derived per-tick values (display and scoring only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub drive_force: f32,         // N, longitudinal at the contact patch (after brake)
    pub drag_force: f32,          // N, magnitude
    pub rolling_resistance: f32,  // N, magnitude
    pub lateral_front: f32,       // N
    pub lateral_rear: f32,        // N
    pub steer_angle: f32,         // rad, effective road-wheel angle
    pub distance: f32,            // m, total path length
    pub fuel_rate: f32,           // g/s, from crankshaft power
    pub tire_wear: f32,           // %, accumulated tread loss (0..100)
}

/// Complete snapshot published at a tick boundary. Never mutated after
/// publication; the loop replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub tick: u64,
    pub time: f64,  // s of simulated time
    pub engine: EngineState,
    pub corners: [CornerState; 4],
    pub chassis: ChassisState,
    pub telemetry: Telemetry,
}

impl VehicleState {
    pub fn corner(&self, id: WheelId) -> &CornerState {
        &self.corners[id.index()]
    }

    pub fn total_normal_load(&self) -> f32 {
        self.corners.iter().map(|c| c.normal_load).sum()
    }

    /// Nose-down positive pitch angle (rad) from front/rear compression.
    pub fn pitch(&self, wheelbase: f32) -> f32 {
        let front = 0.5 * (self.corners[0].compression + self.corners[1].compression);
        let rear = 0.5 * (self.corners[2].compression + self.corners[3].compression);
        ((front - rear) / wheelbase.max(1e-3)).atan()
    }

    /// Right-side-down positive roll angle (rad) from left/right compression.
    pub fn roll(&self, track_width: f32) -> f32 {
        let left = 0.5 * (self.corners[0].compression + self.corners[2].compression);
        let right = 0.5 * (self.corners[1].compression + self.corners[3].compression);
        ((right - left) / track_width.max(1e-3)).atan()
    }

    pub fn is_finite(&self) -> bool {
        let c = &self.chassis;
        c.position.iter().all(|v| v.is_finite())
            && c.velocity.iter().all(|v| v.is_finite())
            && c.heading.is_finite()
            && c.yaw_rate.is_finite()
            && self.engine.rpm.is_finite()
            && self.corners.iter().all(|k| {
                k.compression.is_finite() && k.compression_velocity.is_finite() && k.normal_load.is_finite()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_input_clamps_out_of_range() {
        let raw = ControlInput { throttle: 1.7, brake: -0.2, steer: -3.0, shift: ShiftRequest::Up };
        let c = raw.clamped();
        assert_eq!(c.throttle, 1.0);
        assert_eq!(c.brake, 0.0);
        assert_eq!(c.steer, -1.0);
        assert_eq!(c.shift, ShiftRequest::Up);
    }

    #[test]
    fn test_control_input_nan_reads_as_released() {
        let c = ControlInput::new(f32::NAN, f32::NAN, f32::NAN).clamped();
        assert_eq!(c, ControlInput::default());
    }

    #[test]
    fn test_wheel_order_matches_index() {
        for (i, id) in WheelId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
        assert!(WheelId::FL.is_front() && WheelId::FL.is_left());
        assert!(!WheelId::RR.is_front() && !WheelId::RR.is_left());
        assert_eq!(WheelId::RL.to_string(), "RL");
    }

    #[test]
    fn test_shift_request_wire_names() {
        let json = serde_json::to_string(&ShiftRequest::Down).unwrap();
        assert_eq!(json, "\"down\"");
        let input: ControlInput =
            serde_json::from_str(r#"{"throttle":0.5,"brake":0.0,"steer":0.1}"#).unwrap();
        assert_eq!(input.shift, ShiftRequest::None);
    }

    #[test]
    fn test_pitch_and_roll_from_compression() {
        let mut corners = [CornerState::default(); 4];
        corners[WheelId::FL.index()].compression = 0.06;
        corners[WheelId::FR.index()].compression = 0.06;
        corners[WheelId::RL.index()].compression = 0.02;
        corners[WheelId::RR.index()].compression = 0.02;
        let state = VehicleState {
            tick: 0,
            time: 0.0,
            engine: EngineState::idle(900.0),
            corners,
            chassis: ChassisState::default(),
            telemetry: Telemetry::default(),
        };

        assert!((state.pitch(2.0) - (0.02f32).atan()).abs() < 1e-6, "nose should dip");
        assert_eq!(state.roll(1.5), 0.0);
        assert!(state.is_finite());
    }

    #[test]
    fn test_body_frame_velocity() {
        let chassis = ChassisState {
            heading: std::f32::consts::FRAC_PI_2,
            velocity: Vec2::new(0.0, 10.0),
            ..Default::default()
        };
        let (v_long, v_lat) = chassis.local_velocity();
        assert!((v_long - 10.0).abs() < 1e-4);
        assert!(v_lat.abs() < 1e-4);
    }
}
