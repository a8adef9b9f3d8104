// ==============================================================================
// params.rs - VEHICLE TUNING SURFACE (IMMUTABLE PER RUN)
// ------------------------------------------------------------------------------
// ParameterSet bundles every tunable constant of one vehicle. It is built once
// at vehicle selection, validated by SimulationLoop::start(), and never
// mutated while a run is live.
//
// Persistence:
// - serde (JSON files for the CLI)
// - to_flat_map()/from_flat_map(): flat `name -> number` mapping for the
//   storage collaborator ("gear_ratio.2", "suspension_stiffness.fl", ...)
//
// Presets: gt86(), urus(), truck().
// ==============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::vehicle::types::WheelId;

pub const GRAVITY: f32 = 9.81;      // m/s²
pub const AIR_DENSITY: f32 = 1.225; // kg/m³

// ============================================
// Torque curve
// ============================================

/// Piecewise-linear engine torque (rpm → Nm), clamped at both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TorqueCurve {
    pub points: Vec<(f32, f32)>,
}

impl TorqueCurve {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }

    pub fn torque_at(&self, rpm: f32) -> f32 {
        let pts = &self.points;
        let Some(&(first_rpm, first_nm)) = pts.first() else { return 0.0 };
        if rpm <= first_rpm {
            return first_nm;
        }

        for w in pts.windows(2) {
            let (r0, t0) = w[0];
            let (r1, t1) = w[1];
            if rpm <= r1 {
                let s = (rpm - r0) / (r1 - r0);
                return t0 + (t1 - t0) * s;
            }
        }

        pts.last().map(|p| p.1).unwrap_or(0.0)
    }

    pub fn peak(&self) -> f32 {
        self.points.iter().map(|p| p.1).fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    #[default]
    Automatic,
    Manual,
}

// ============================================
// Parameter set
// ============================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    // --- Mass & geometry ---
    pub mass: f32,                  // kg
    pub yaw_inertia: f32,           // kg·m²
    pub wheelbase: f32,             // m (front axle to rear axle)
    pub track_width: f32,           // m (left to right)
    pub cg_height: f32,             // m
    pub front_weight_fraction: f32, // 0..1, static share on the front axle
    pub wheel_radius: f32,          // m

    // --- Resistance ---
    pub drag_coefficient: f32,
    pub frontal_area: f32,          // m²
    pub rolling_resistance: f32,    // dimensionless, × normal load

    // --- Tires ---
    pub tire_friction: f32,         // (0, 1]
    pub slip_saturation: f32,       // rad, slip proxy reaches ±1 here

    // --- Engine & driveline ---
    pub torque_curve: TorqueCurve,
    pub idle_rpm: f32,
    pub redline_rpm: f32,
    pub launch_rpm: f32,            // clutch-slip target at full throttle from rest
    pub upshift_rpm: f32,
    pub downshift_rpm: f32,
    pub gear_ratios: Vec<f32>,      // 1st first, strictly decreasing
    pub final_drive: f32,
    pub drivetrain_efficiency: f32, // 0..1
    #[serde(default)]
    pub transmission: Transmission,
    pub max_brake_force: f32,       // N, all four wheels together

    // --- Suspension (FL, FR, RL, RR) ---
    pub suspension_stiffness: [f32; 4], // N/m
    pub suspension_damping: [f32; 4],   // N·s/m

    // --- Steering ---
    pub steering_limit: f32,        // rad
    pub steer_fade_speed: f32,      // m/s, steering authority tapers toward this

    // --- Loop ---
    pub fixed_dt: f32,              // s
    pub max_steps_per_poll: u32,
}

impl ParameterSet {
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gt86" => Some(Self::gt86()),
            "urus" => Some(Self::urus()),
            "truck" => Some(Self::truck()),
            _ => None,
        }
    }

    pub const PRESETS: [&'static str; 3] = ["gt86", "urus", "truck"];

    /// Light rear-drive coupe.
    pub fn gt86() -> Self {
        Self {
            mass: 1350.0,
            yaw_inertia: 2000.0,
            wheelbase: 2.57,
            track_width: 1.52,
            cg_height: 0.46,
            front_weight_fraction: 0.53,
            wheel_radius: 0.31,

            drag_coefficient: 0.27,
            frontal_area: 2.0,
            rolling_resistance: 0.015,

            tire_friction: 0.9,
            slip_saturation: 0.14,

            torque_curve: TorqueCurve::new(vec![
                (1000.0, 150.0),
                (2000.0, 175.0),
                (3000.0, 190.0),
                (4000.0, 180.0),
                (5000.0, 195.0),
                (6500.0, 205.0),
                (7500.0, 185.0),
            ]),
            idle_rpm: 900.0,
            redline_rpm: 7500.0,
            launch_rpm: 3000.0,
            upshift_rpm: 7000.0,
            downshift_rpm: 3000.0,
            gear_ratios: vec![3.626, 2.188, 1.541, 1.213, 1.000, 0.767],
            final_drive: 4.1,
            drivetrain_efficiency: 0.85,
            transmission: Transmission::Automatic,
            max_brake_force: 12_000.0,

            suspension_stiffness: [42_000.0, 42_000.0, 38_000.0, 38_000.0],
            suspension_damping: [6_000.0, 6_000.0, 5_500.0, 5_500.0],

            steering_limit: 0.6,
            steer_fade_speed: 30.0,

            fixed_dt: 1.0 / 120.0,
            max_steps_per_poll: 8,
        }
    }

    /// Heavy all-wheel SUV, the default menu vehicle.
    pub fn urus() -> Self {
        Self {
            mass: 2200.0,
            yaw_inertia: 4200.0,
            wheelbase: 3.0,
            track_width: 1.7,
            cg_height: 0.62,
            front_weight_fraction: 0.57,
            wheel_radius: 0.37,

            drag_coefficient: 0.3,
            frontal_area: 2.2,
            rolling_resistance: 0.015,

            tire_friction: 0.95,
            slip_saturation: 0.15,

            torque_curve: TorqueCurve::new(vec![
                (800.0, 400.0),
                (2250.0, 850.0),
                (4500.0, 850.0),
                (6000.0, 760.0),
                (6800.0, 650.0),
            ]),
            idle_rpm: 800.0,
            redline_rpm: 6800.0,
            launch_rpm: 2500.0,
            upshift_rpm: 6000.0,
            downshift_rpm: 2200.0,
            gear_ratios: vec![5.0, 3.2, 2.14, 1.72, 1.31, 1.0, 0.82, 0.64],
            final_drive: 3.15,
            drivetrain_efficiency: 0.85,
            transmission: Transmission::Automatic,
            max_brake_force: 20_000.0,

            suspension_stiffness: [60_000.0, 60_000.0, 55_000.0, 55_000.0],
            suspension_damping: [7_000.0, 7_000.0, 6_500.0, 6_500.0],

            steering_limit: 0.55,
            steer_fade_speed: 35.0,

            fixed_dt: 1.0 / 120.0,
            max_steps_per_poll: 8,
        }
    }

    pub fn truck() -> Self {
        Self {
            mass: 7500.0,
            yaw_inertia: 40_000.0,
            wheelbase: 4.5,
            track_width: 2.0,
            cg_height: 1.2,
            front_weight_fraction: 0.45,
            wheel_radius: 0.5,

            drag_coefficient: 0.7,
            frontal_area: 7.0,
            rolling_resistance: 0.008,

            tire_friction: 0.8,
            slip_saturation: 0.12,

            torque_curve: TorqueCurve::new(vec![
                (600.0, 900.0),
                (1200.0, 1800.0),
                (1800.0, 1800.0),
                (2600.0, 1300.0),
            ]),
            idle_rpm: 600.0,
            redline_rpm: 2600.0,
            launch_rpm: 1200.0,
            upshift_rpm: 2200.0,
            downshift_rpm: 1200.0,
            gear_ratios: vec![6.0, 4.0, 2.7, 1.9, 1.35, 1.0],
            final_drive: 4.5,
            drivetrain_efficiency: 0.85,
            transmission: Transmission::Automatic,
            max_brake_force: 60_000.0,

            suspension_stiffness: [250_000.0; 4],
            suspension_damping: [20_000.0; 4],

            steering_limit: 0.5,
            steer_fade_speed: 20.0,

            fixed_dt: 1.0 / 120.0,
            max_steps_per_poll: 8,
        }
    }

    // --------------------------------------------------
    // Derived quantities
    // --------------------------------------------------

    /// Distance CG → front axle (m).
    pub fn cg_to_front(&self) -> f32 {
        self.wheelbase * (1.0 - self.front_weight_fraction)
    }

    /// Distance CG → rear axle (m).
    pub fn cg_to_rear(&self) -> f32 {
        self.wheelbase * self.front_weight_fraction
    }

    /// Static load on one corner (N).
    pub fn static_corner_load(&self, wheel: WheelId) -> f32 {
        let axle = if wheel.is_front() {
            self.front_weight_fraction
        } else {
            1.0 - self.front_weight_fraction
        };
        0.5 * self.mass * GRAVITY * axle
    }

    /// Sprung mass carried by one corner (kg).
    pub fn corner_mass(&self, wheel: WheelId) -> f32 {
        self.static_corner_load(wheel) / GRAVITY
    }

    /// Overall ratio engine → wheel in `gear`.
    pub fn overall_ratio(&self, gear: usize) -> f32 {
        let idx = gear.min(self.gear_ratios.len().saturating_sub(1));
        self.gear_ratios.get(idx).copied().unwrap_or(1.0) * self.final_drive
    }

    // --------------------------------------------------
    // Validation
    // --------------------------------------------------

    pub fn validate(&self) -> Result<(), SimError> {
        let scalars = [
            ("mass", self.mass),
            ("yaw_inertia", self.yaw_inertia),
            ("wheelbase", self.wheelbase),
            ("track_width", self.track_width),
            ("cg_height", self.cg_height),
            ("front_weight_fraction", self.front_weight_fraction),
            ("wheel_radius", self.wheel_radius),
            ("drag_coefficient", self.drag_coefficient),
            ("frontal_area", self.frontal_area),
            ("rolling_resistance", self.rolling_resistance),
            ("tire_friction", self.tire_friction),
            ("slip_saturation", self.slip_saturation),
            ("idle_rpm", self.idle_rpm),
            ("redline_rpm", self.redline_rpm),
            ("launch_rpm", self.launch_rpm),
            ("upshift_rpm", self.upshift_rpm),
            ("downshift_rpm", self.downshift_rpm),
            ("final_drive", self.final_drive),
            ("drivetrain_efficiency", self.drivetrain_efficiency),
            ("max_brake_force", self.max_brake_force),
            ("steering_limit", self.steering_limit),
            ("steer_fade_speed", self.steer_fade_speed),
            ("fixed_dt", self.fixed_dt),
        ];
        for (field, v) in scalars {
            if !v.is_finite() {
                return Err(SimError::invalid(field, "must be finite"));
            }
        }

        let positive = [
            ("mass", self.mass),
            ("yaw_inertia", self.yaw_inertia),
            ("wheelbase", self.wheelbase),
            ("track_width", self.track_width),
            ("wheel_radius", self.wheel_radius),
            ("slip_saturation", self.slip_saturation),
            ("final_drive", self.final_drive),
            ("steering_limit", self.steering_limit),
            ("steer_fade_speed", self.steer_fade_speed),
            ("fixed_dt", self.fixed_dt),
        ];
        for (field, v) in positive {
            if v <= 0.0 {
                return Err(SimError::invalid(field, format!("must be > 0 (got {v})")));
            }
        }

        let non_negative = [
            ("cg_height", self.cg_height),
            ("drag_coefficient", self.drag_coefficient),
            ("frontal_area", self.frontal_area),
            ("rolling_resistance", self.rolling_resistance),
            ("max_brake_force", self.max_brake_force),
        ];
        for (field, v) in non_negative {
            if v < 0.0 {
                return Err(SimError::invalid(field, format!("must be >= 0 (got {v})")));
            }
        }

        if !(self.tire_friction > 0.0 && self.tire_friction <= 1.0) {
            return Err(SimError::invalid("tire_friction", "must be in (0, 1]"));
        }
        if !(self.front_weight_fraction > 0.0 && self.front_weight_fraction < 1.0) {
            return Err(SimError::invalid("front_weight_fraction", "must be in (0, 1)"));
        }
        if !(self.drivetrain_efficiency > 0.0 && self.drivetrain_efficiency <= 1.0) {
            return Err(SimError::invalid("drivetrain_efficiency", "must be in (0, 1]"));
        }
        if self.fixed_dt > 0.1 {
            return Err(SimError::invalid("fixed_dt", "must be <= 0.1 s"));
        }
        if self.max_steps_per_poll == 0 {
            return Err(SimError::invalid("max_steps_per_poll", "must be >= 1"));
        }

        self.validate_engine()?;
        self.validate_gears()?;
        self.validate_suspension()?;

        Ok(())
    }

    fn validate_engine(&self) -> Result<(), SimError> {
        let pts = &self.torque_curve.points;
        if pts.is_empty() {
            return Err(SimError::invalid("torque_curve", "needs at least one point"));
        }
        for (i, &(rpm, nm)) in pts.iter().enumerate() {
            if !rpm.is_finite() || !nm.is_finite() {
                return Err(SimError::invalid(format!("torque_curve.{i}"), "must be finite"));
            }
            if nm < 0.0 {
                return Err(SimError::invalid(format!("torque_curve.{i}.nm"), "torque must be >= 0"));
            }
        }
        if pts.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(SimError::invalid("torque_curve", "rpm must be strictly increasing"));
        }

        if !(self.idle_rpm > 0.0
            && self.idle_rpm < self.downshift_rpm
            && self.downshift_rpm < self.upshift_rpm
            && self.upshift_rpm < self.redline_rpm)
        {
            return Err(SimError::invalid(
                "upshift_rpm",
                "need 0 < idle < downshift < upshift < redline",
            ));
        }
        if !(self.launch_rpm >= self.idle_rpm && self.launch_rpm <= self.redline_rpm) {
            return Err(SimError::invalid("launch_rpm", "must lie within [idle, redline]"));
        }
        Ok(())
    }

    fn validate_gears(&self) -> Result<(), SimError> {
        if self.gear_ratios.is_empty() {
            return Err(SimError::invalid("gear_ratios", "needs at least one gear"));
        }
        for (i, &r) in self.gear_ratios.iter().enumerate() {
            if !r.is_finite() || r <= 0.0 {
                return Err(SimError::invalid(format!("gear_ratio.{i}"), "must be > 0"));
            }
        }
        for (i, w) in self.gear_ratios.windows(2).enumerate() {
            if w[1] >= w[0] {
                return Err(SimError::invalid(
                    format!("gear_ratio.{}", i + 1),
                    "ratios must strictly decrease with gear index",
                ));
            }
            // rpm right after an upshift must stay above the downshift point
            let landed = self.upshift_rpm * w[1] / w[0];
            if landed <= self.downshift_rpm {
                return Err(SimError::invalid(
                    format!("gear_ratio.{}", i + 1),
                    format!(
                        "upshift lands at {landed:.0} rpm, at or below downshift_rpm {}",
                        self.downshift_rpm
                    ),
                ));
            }
        }
        Ok(())
    }

    fn validate_suspension(&self) -> Result<(), SimError> {
        let dt = self.fixed_dt;
        for id in WheelId::ALL {
            let k = self.suspension_stiffness[id.index()];
            let c = self.suspension_damping[id.index()];
            if !k.is_finite() || k <= 0.0 {
                return Err(SimError::invalid(
                    format!("suspension_stiffness.{}", id.key()),
                    "must be > 0",
                ));
            }
            if !c.is_finite() || c < 0.0 {
                return Err(SimError::invalid(
                    format!("suspension_damping.{}", id.key()),
                    "must be >= 0",
                ));
            }

            // semi-implicit Euler on m·x'' = F - kx - cx' stays well inside
            // its stability region below these bounds
            let m = self.corner_mass(id);
            let omega_dt = (k / m).sqrt() * dt;
            if omega_dt >= 1.0 {
                return Err(SimError::invalid(
                    format!("suspension_stiffness.{}", id.key()),
                    format!("too stiff for fixed_dt (omega*dt = {omega_dt:.2})"),
                ));
            }
            if c * dt / m >= 1.0 {
                return Err(SimError::invalid(
                    format!("suspension_damping.{}", id.key()),
                    "too much damping for fixed_dt",
                ));
            }
        }
        Ok(())
    }

    // --------------------------------------------------
    // Flat mapping (persistence collaborator)
    // --------------------------------------------------

    pub fn to_flat_map(&self) -> BTreeMap<String, f64> {
        let mut m = BTreeMap::new();
        let mut put = |k: &str, v: f32| {
            m.insert(k.to_string(), v as f64);
        };

        put("mass", self.mass);
        put("yaw_inertia", self.yaw_inertia);
        put("wheelbase", self.wheelbase);
        put("track_width", self.track_width);
        put("cg_height", self.cg_height);
        put("front_weight_fraction", self.front_weight_fraction);
        put("wheel_radius", self.wheel_radius);
        put("drag_coefficient", self.drag_coefficient);
        put("frontal_area", self.frontal_area);
        put("rolling_resistance", self.rolling_resistance);
        put("tire_friction", self.tire_friction);
        put("slip_saturation", self.slip_saturation);
        put("idle_rpm", self.idle_rpm);
        put("redline_rpm", self.redline_rpm);
        put("launch_rpm", self.launch_rpm);
        put("upshift_rpm", self.upshift_rpm);
        put("downshift_rpm", self.downshift_rpm);
        put("final_drive", self.final_drive);
        put("drivetrain_efficiency", self.drivetrain_efficiency);
        put("max_brake_force", self.max_brake_force);
        put("steering_limit", self.steering_limit);
        put("steer_fade_speed", self.steer_fade_speed);
        put("fixed_dt", self.fixed_dt);

        for (i, r) in self.gear_ratios.iter().enumerate() {
            put(&format!("gear_ratio.{i}"), *r);
        }
        for (i, (rpm, nm)) in self.torque_curve.points.iter().enumerate() {
            put(&format!("torque_curve.{i}.rpm"), *rpm);
            put(&format!("torque_curve.{i}.nm"), *nm);
        }
        for id in WheelId::ALL {
            put(&format!("suspension_stiffness.{}", id.key()), self.suspension_stiffness[id.index()]);
            put(&format!("suspension_damping.{}", id.key()), self.suspension_damping[id.index()]);
        }

        m.insert("max_steps_per_poll".into(), self.max_steps_per_poll as f64);
        m.insert(
            "transmission".into(),
            match self.transmission {
                Transmission::Automatic => 0.0,
                Transmission::Manual => 1.0,
            },
        );
        m
    }

    /// Rebuilds and validates a set stored with [`ParameterSet::to_flat_map`].
    pub fn from_flat_map(map: &BTreeMap<String, f64>) -> Result<Self, SimError> {
        let get = |k: &str| -> Result<f32, SimError> {
            map.get(k)
                .map(|v| *v as f32)
                .ok_or_else(|| SimError::invalid(k, "missing from stored mapping"))
        };

        let mut gear_ratios = Vec::new();
        while let Some(r) = map.get(&format!("gear_ratio.{}", gear_ratios.len())) {
            gear_ratios.push(*r as f32);
        }

        let mut points = Vec::new();
        loop {
            let i = points.len();
            let (Some(rpm), Some(nm)) = (
                map.get(&format!("torque_curve.{i}.rpm")),
                map.get(&format!("torque_curve.{i}.nm")),
            ) else { break };
            points.push((*rpm as f32, *nm as f32));
        }

        let mut suspension_stiffness = [0.0; 4];
        let mut suspension_damping = [0.0; 4];
        for id in WheelId::ALL {
            suspension_stiffness[id.index()] = get(&format!("suspension_stiffness.{}", id.key()))?;
            suspension_damping[id.index()] = get(&format!("suspension_damping.{}", id.key()))?;
        }

        let steps = get("max_steps_per_poll")?;
        if !(steps.is_finite() && steps >= 0.0 && steps.fract() == 0.0) {
            return Err(SimError::invalid("max_steps_per_poll", "must be a whole number"));
        }

        let transmission = match map.get("transmission").copied().unwrap_or(0.0) {
            v if v == 0.0 => Transmission::Automatic,
            v if v == 1.0 => Transmission::Manual,
            _ => return Err(SimError::invalid("transmission", "expected 0 (automatic) or 1 (manual)")),
        };

        let params = Self {
            mass: get("mass")?,
            yaw_inertia: get("yaw_inertia")?,
            wheelbase: get("wheelbase")?,
            track_width: get("track_width")?,
            cg_height: get("cg_height")?,
            front_weight_fraction: get("front_weight_fraction")?,
            wheel_radius: get("wheel_radius")?,
            drag_coefficient: get("drag_coefficient")?,
            frontal_area: get("frontal_area")?,
            rolling_resistance: get("rolling_resistance")?,
            tire_friction: get("tire_friction")?,
            slip_saturation: get("slip_saturation")?,
            torque_curve: TorqueCurve::new(points),
            idle_rpm: get("idle_rpm")?,
            redline_rpm: get("redline_rpm")?,
            launch_rpm: get("launch_rpm")?,
            upshift_rpm: get("upshift_rpm")?,
            downshift_rpm: get("downshift_rpm")?,
            gear_ratios,
            final_drive: get("final_drive")?,
            drivetrain_efficiency: get("drivetrain_efficiency")?,
            transmission,
            max_brake_force: get("max_brake_force")?,
            suspension_stiffness,
            suspension_damping,
            steering_limit: get("steering_limit")?,
            steer_fade_speed: get("steer_fade_speed")?,
            fixed_dt: get("fixed_dt")?,
            max_steps_per_poll: steps as u32,
        };

        params.validate()?;
        Ok(params)
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self::gt86()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: SimError) -> String {
        match err {
            SimError::InvalidParameter { field, .. } => field,
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_presets_validate() {
        for name in ParameterSet::PRESETS {
            let p = ParameterSet::preset(name).unwrap();
            assert!(p.validate().is_ok(), "preset {name} failed: {:?}", p.validate());
        }
        assert!(ParameterSet::preset("hovercraft").is_none());
    }

    #[test]
    fn test_torque_curve_interpolates_and_clamps() {
        let curve = TorqueCurve::new(vec![(1000.0, 100.0), (3000.0, 300.0)]);
        assert_eq!(curve.torque_at(500.0), 100.0);
        assert!((curve.torque_at(2000.0) - 200.0).abs() < 1e-3);
        assert_eq!(curve.torque_at(9000.0), 300.0);
        assert_eq!(curve.peak(), 300.0);
    }

    #[test]
    fn test_rejects_non_positive_mass() {
        let p = ParameterSet { mass: 0.0, ..ParameterSet::gt86() };
        assert_eq!(field_of(p.validate().unwrap_err()), "mass");
    }

    #[test]
    fn test_rejects_empty_gear_list() {
        let p = ParameterSet { gear_ratios: vec![], ..ParameterSet::gt86() };
        assert_eq!(field_of(p.validate().unwrap_err()), "gear_ratios");
    }

    #[test]
    fn test_rejects_friction_out_of_range() {
        let p = ParameterSet { tire_friction: 1.3, ..ParameterSet::gt86() };
        assert_eq!(field_of(p.validate().unwrap_err()), "tire_friction");
        let p = ParameterSet { tire_friction: 0.0, ..ParameterSet::gt86() };
        assert_eq!(field_of(p.validate().unwrap_err()), "tire_friction");
    }

    #[test]
    fn test_rejects_increasing_ratios() {
        let p = ParameterSet { gear_ratios: vec![3.0, 3.5], ..ParameterSet::gt86() };
        assert_eq!(field_of(p.validate().unwrap_err()), "gear_ratio.1");
    }

    #[test]
    fn test_rejects_gear_hunting_thresholds() {
        // 7000 * 1.0 / 3.0 = 2333 rpm after the shift, below downshift 3000
        let p = ParameterSet { gear_ratios: vec![3.0, 1.0], ..ParameterSet::gt86() };
        assert_eq!(field_of(p.validate().unwrap_err()), "gear_ratio.1");
    }

    #[test]
    fn test_rejects_unstable_suspension() {
        let mut p = ParameterSet::gt86();
        p.suspension_stiffness[2] = 1.0e8;
        assert_eq!(field_of(p.validate().unwrap_err()), "suspension_stiffness.rl");
    }

    #[test]
    fn test_flat_map_reload_matches() {
        let mut p = ParameterSet::urus();
        p.transmission = Transmission::Manual;
        let map = p.to_flat_map();
        assert_eq!(map["gear_ratio.7"], 0.64f32 as f64);
        assert_eq!(map["transmission"], 1.0);

        let back = ParameterSet::from_flat_map(&map).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_flat_map_missing_field_is_reported() {
        let mut map = ParameterSet::gt86().to_flat_map();
        map.remove("final_drive");
        assert_eq!(field_of(ParameterSet::from_flat_map(&map).unwrap_err()), "final_drive");
    }

    #[test]
    fn test_static_loads_sum_to_weight() {
        let p = ParameterSet::gt86();
        let total: f32 = WheelId::ALL.iter().map(|w| p.static_corner_load(*w)).sum();
        assert!((total - p.mass * GRAVITY).abs() < 1e-2);
        assert!((p.cg_to_front() + p.cg_to_rear() - p.wheelbase).abs() < 1e-5);
    }
}
